//! SSL certificate lifecycle

use registrar_common::resilience::{CallContext, Clock};
use registrar_domain::{
    ActivationRequest, Certificate, CertificateDetails, CertificateOrder, RegistrarError, Result,
};
use serde::Deserialize;
use tracing::info;

use super::client::{operation_failed, require_non_empty, require_positive, NamecheapClient};
use super::command::{names, Command};
use super::wire::{amount, flag, optional_number};
use crate::http::Transport;

#[derive(Debug, Deserialize)]
struct GetListResponse {
    #[serde(rename = "SSLGetListResult")]
    result: CertificateList,
}

#[derive(Debug, Deserialize)]
struct CertificateList {
    #[serde(rename = "SSL", default)]
    certificates: Vec<WireCertificate>,
}

#[derive(Debug, Deserialize)]
struct WireCertificate {
    #[serde(rename = "@CertificateID")]
    certificate_id: u64,
    #[serde(rename = "@HostName", default)]
    host_name: String,
    #[serde(rename = "@SSLType", default)]
    ssl_type: String,
    #[serde(rename = "@PurchaseDate", default)]
    purchase_date: String,
    #[serde(rename = "@ExpireDate", default)]
    expire_date: String,
    #[serde(rename = "@ActivationExpireDate", default)]
    activation_expire_date: String,
    #[serde(rename = "@IsExpiredYN", default, deserialize_with = "flag")]
    is_expired: bool,
    #[serde(rename = "@Status", default)]
    status: String,
    #[serde(rename = "@Years", default, deserialize_with = "optional_number")]
    years: Option<u32>,
}

impl From<WireCertificate> for Certificate {
    fn from(wire: WireCertificate) -> Self {
        Self {
            certificate_id: wire.certificate_id,
            host_name: wire.host_name,
            ssl_type: wire.ssl_type,
            purchase_date: wire.purchase_date,
            expire_date: wire.expire_date,
            activation_expire_date: wire.activation_expire_date,
            is_expired: wire.is_expired,
            status: wire.status,
            years: wire.years.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(rename = "SSLCreateResult")]
    result: WireCreate,
}

#[derive(Debug, Deserialize)]
struct WireCreate {
    #[serde(rename = "@IsSuccess", default, deserialize_with = "flag")]
    is_success: bool,
    #[serde(rename = "@OrderId", alias = "@OrderID", default)]
    order_id: u64,
    #[serde(rename = "@TransactionId", alias = "@TransactionID", default)]
    transaction_id: u64,
    #[serde(rename = "@ChargedAmount", default, deserialize_with = "amount")]
    charged_amount: f64,
    #[serde(rename = "@SSLCertificateID", default, deserialize_with = "optional_number")]
    certificate_id: Option<u64>,
    #[serde(rename = "SSLCertificate", default)]
    certificate: Option<WireCreatedCertificate>,
}

#[derive(Debug, Deserialize)]
struct WireCreatedCertificate {
    #[serde(rename = "@CertificateID")]
    certificate_id: u64,
}

#[derive(Debug, Deserialize)]
struct GetInfoResponse {
    #[serde(rename = "SSLGetInfoResult")]
    result: WireDetails,
}

#[derive(Debug, Deserialize)]
struct WireDetails {
    #[serde(rename = "@CertificateID", default, deserialize_with = "optional_number")]
    certificate_id: Option<u64>,
    #[serde(rename = "@HostName", default)]
    host_name: String,
    #[serde(rename = "@SSLType", alias = "@Type", default)]
    ssl_type: String,
    #[serde(rename = "@Status", default)]
    status: String,
    #[serde(rename = "@StatusDescription", default)]
    status_description: String,
    #[serde(rename = "@ExpireDate", alias = "@Expires", default)]
    expire_date: String,
    #[serde(rename = "@Years", default, deserialize_with = "optional_number")]
    years: Option<u32>,
    #[serde(rename = "Provider", default)]
    provider: Option<WireProvider>,
    #[serde(rename = "ApproverEmailList", default)]
    approver_emails: Option<WireEmailList>,
}

#[derive(Debug, Deserialize)]
struct WireProvider {
    #[serde(rename = "@Name", default)]
    name_attribute: Option<String>,
    #[serde(rename = "Name", default)]
    name_element: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireEmailList {
    #[serde(rename = "Email", default)]
    emails: Vec<String>,
}

impl WireDetails {
    fn into_details(self, requested_id: u64) -> CertificateDetails {
        let provider = self
            .provider
            .and_then(|provider| provider.name_attribute.or(provider.name_element))
            .unwrap_or_default();
        CertificateDetails {
            certificate_id: self.certificate_id.unwrap_or(requested_id),
            host_name: self.host_name,
            ssl_type: self.ssl_type,
            status: self.status,
            status_description: self.status_description,
            expire_date: self.expire_date,
            years: self.years.unwrap_or_default(),
            provider,
            approver_emails: self.approver_emails.map(|list| list.emails).unwrap_or_default(),
        }
    }
}

/// `IsSuccess` flag shared by activate, resend and reissue results.
#[derive(Debug, Deserialize)]
struct WireSuccess {
    #[serde(rename = "@IsSuccess", default, deserialize_with = "flag")]
    is_success: bool,
}

#[derive(Debug, Deserialize)]
struct ActivateResponse {
    #[serde(rename = "SSLActivateResult")]
    result: WireSuccess,
}

#[derive(Debug, Deserialize)]
struct ResendResponse {
    #[serde(rename = "SSLResendApproverEmailResult", alias = "SSLResendResult")]
    result: WireSuccess,
}

#[derive(Debug, Deserialize)]
struct ReissueResponse {
    #[serde(rename = "SSLReissueResult")]
    result: WireSuccess,
}

fn activate_command(request: &ActivationRequest) -> Result<Command> {
    require_non_empty("csr", &request.csr)?;
    if !(request.http_validation || request.dns_validation) {
        require_non_empty("approver_email", &request.approver_email)?;
    }

    let mut command = Command::new(names::SSL_ACTIVATE)
        .param("CertificateID", request.certificate_id)
        .param("CSR", &request.csr);
    if !request.domain_name.trim().is_empty() {
        command.set("DomainName", request.domain_name.trim());
    }
    if !request.approver_email.trim().is_empty() {
        command.set("ApproverEmail", request.approver_email.trim());
    }
    if request.http_validation {
        command.set("HTTPDCValidation", "TRUE");
    }
    if request.dns_validation {
        command.set("DNSDCValidation", "TRUE");
    }
    if let Some(server) = &request.web_server_type {
        command.set("WebServerType", server);
    }
    Ok(command)
}

impl<T: Transport, C: Clock> NamecheapClient<T, C> {
    pub async fn list_certificates(&self, ctx: &CallContext) -> Result<Vec<Certificate>> {
        let command = Command::new(names::SSL_GET_LIST);
        let response: GetListResponse = self.pipeline().execute_typed(ctx, &command).await?;
        Ok(response.result.certificates.into_iter().map(Certificate::from).collect())
    }

    /// Certificates issued for `domain` or one of its sub-domains.
    pub async fn certificates_for_domain(
        &self,
        ctx: &CallContext,
        domain: &str,
    ) -> Result<Vec<Certificate>> {
        require_non_empty("domain", domain)?;
        let certificates = self.list_certificates(ctx).await?;
        Ok(certificates.into_iter().filter(|certificate| certificate.covers(domain)).collect())
    }

    /// Whether any certificate on the account covers `domain`.
    pub async fn certificate_exists(&self, ctx: &CallContext, domain: &str) -> Result<bool> {
        Ok(!self.certificates_for_domain(ctx, domain).await?.is_empty())
    }

    /// Purchase a certificate of `certificate_type` (e.g. `PositiveSSL`).
    pub async fn create_certificate(
        &self,
        ctx: &CallContext,
        certificate_type: &str,
        years: u32,
        sans_to_add: Option<u32>,
    ) -> Result<CertificateOrder> {
        require_non_empty("certificate_type", certificate_type)?;
        require_positive("years", years)?;
        let mut command =
            Command::new(names::SSL_CREATE).param("Type", certificate_type.trim()).param("Years", years);
        if let Some(sans) = sans_to_add.filter(|sans| *sans > 0) {
            command.set("SANStoAdd", sans);
        }

        let response: CreateResponse = self.pipeline().execute_typed(ctx, &command).await?;
        let wire = response.result;
        if !wire.is_success {
            return Err(operation_failed(&command, "certificate was not purchased"));
        }
        let certificate_id = wire
            .certificate_id
            .or(wire.certificate.map(|certificate| certificate.certificate_id))
            .ok_or_else(|| RegistrarError::ProtocolError {
                detail: "SSLCreateResult carries no certificate id".to_string(),
            })?;

        info!(certificate_id, certificate_type, years, "Purchased certificate");
        Ok(CertificateOrder {
            certificate_id,
            order_id: wire.order_id,
            transaction_id: wire.transaction_id,
            charged_amount: wire.charged_amount,
        })
    }

    pub async fn activate_certificate(
        &self,
        ctx: &CallContext,
        request: &ActivationRequest,
    ) -> Result<()> {
        let command = activate_command(request)?;
        let response: ActivateResponse = self.pipeline().execute_typed(ctx, &command).await?;
        if !response.result.is_success {
            return Err(operation_failed(
                &command,
                format!("certificate {} was not activated", request.certificate_id),
            ));
        }
        info!(certificate_id = request.certificate_id, "Activated certificate");
        Ok(())
    }

    pub async fn get_certificate(
        &self,
        ctx: &CallContext,
        certificate_id: u64,
    ) -> Result<CertificateDetails> {
        let command = Command::new(names::SSL_GET_INFO).param("CertificateID", certificate_id);
        let response: GetInfoResponse = self.pipeline().execute_typed(ctx, &command).await?;
        Ok(response.result.into_details(certificate_id))
    }

    pub async fn resend_approval_email(&self, ctx: &CallContext, certificate_id: u64) -> Result<()> {
        let command =
            Command::new(names::SSL_RESEND_APPROVER_EMAIL).param("CertificateID", certificate_id);
        let response: ResendResponse = self.pipeline().execute_typed(ctx, &command).await?;
        if !response.result.is_success {
            return Err(operation_failed(&command, "approval email was not resent"));
        }
        Ok(())
    }

    pub async fn reissue_certificate(
        &self,
        ctx: &CallContext,
        certificate_id: u64,
        csr: &str,
        approver_email: &str,
    ) -> Result<()> {
        require_non_empty("csr", csr)?;
        require_non_empty("approver_email", approver_email)?;
        let command = Command::new(names::SSL_REISSUE)
            .param("CertificateID", certificate_id)
            .param("CSR", csr)
            .param("ApproverEmail", approver_email.trim());
        let response: ReissueResponse = self.pipeline().execute_typed(ctx, &command).await?;
        if !response.result.is_success {
            return Err(operation_failed(
                &command,
                format!("certificate {certificate_id} was not reissued"),
            ));
        }
        info!(certificate_id, "Reissued certificate");
        Ok(())
    }
}
