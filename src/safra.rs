//! Safra correspondent API client — token auth plus the four data
//! operations the quote pipeline chains together.
//!
//! Every operation after `authenticate` requires a held session token;
//! without one the client reports `QuoteError::NotAuthenticated` and
//! never touches the network. HTTP 401/403 map to `Auth`, 5xx to
//! `Server`, transport failures to `Network`, and an empty response
//! body is an empty-but-successful result, not a fault.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::SafraConfig;
use crate::error::{ConfigError, QuoteError};

/// The benefit-plan category every quote targets.
pub const INSS_AGREEMENT: &str = "INSS";

/// Per-call timeout; the partner API is slow under load.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(45);

// ── Wire types ──────────────────────────────────────────────────────

/// Registration data (birth date and sex) held by the partner.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    /// `YYYY-MM-DDT00:00:00`, as the partner returns it.
    pub birth_date: String,
    /// Single letter, `M` or `F`.
    pub sex: String,
}

/// One contract eligible for refinancing.
#[derive(Debug, Clone, Deserialize)]
pub struct Contract {
    #[serde(rename = "idContrato")]
    pub id: i64,
    /// Benefit enrollment number tied to this contract.
    #[serde(rename = "matricula", default)]
    pub enrollment: Option<String>,
    /// Current installment amount.
    #[serde(rename = "valorParcela", default)]
    pub installment: Decimal,
}

/// A viable term/payout pair from a simulation.
#[derive(Debug, Clone, Deserialize)]
pub struct Offer {
    /// Term in months.
    #[serde(rename = "prazo", default)]
    pub term: u32,
    /// Cash released to the customer.
    #[serde(rename = "valorTroco", default)]
    pub payout: Decimal,
}

/// Outcome of simulating one contract: offers, rejection notices, or
/// neither (the partner had nothing to say).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Simulation {
    #[serde(rename = "simulacoes", default)]
    pub offers: Vec<Offer>,
    #[serde(rename = "criticas", default)]
    pub rejections: Vec<String>,
}

/// Everything the simulate call needs besides the contract itself.
#[derive(Debug, Clone)]
pub struct SimulationRequest {
    /// CPF as a bare integer (partner convention).
    pub document: i64,
    pub agreement_id: i64,
    pub employment_status: i32,
    pub birth_date: Option<String>,
    pub sex: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenResponse {
    #[serde(rename = "accessToken")]
    access_token: Option<String>,
    token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RegistrationRow {
    #[serde(rename = "dsSexoCliente")]
    sex: Option<String>,
    #[serde(rename = "dtNascimentoCliente")]
    birth_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AgreementRow {
    #[serde(rename = "nome", default)]
    name: String,
    #[serde(rename = "idConvenio")]
    id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct SimulationPayload<'a> {
    #[serde(rename = "idConvenio")]
    agreement_id: i64,
    #[serde(rename = "cpf")]
    document: i64,
    #[serde(rename = "matricula")]
    enrollment: Option<&'a str>,
    #[serde(rename = "isCotacao")]
    is_quote: bool,
    refins: Vec<RefinRef>,
    #[serde(rename = "dtNascimento")]
    birth_date: Option<&'a str>,
    #[serde(rename = "idSexo")]
    sex: Option<&'a str>,
    #[serde(rename = "idSituacaoEmpregado")]
    employment_status: i32,
}

#[derive(Debug, Serialize)]
struct RefinRef {
    #[serde(rename = "idContrato")]
    contract_id: i64,
}

// ── Trait seam ──────────────────────────────────────────────────────

/// The five partner operations the pipeline depends on.
///
/// A trait so the engine can be exercised against a stub without a
/// network. Operations map one-to-one onto pipeline steps.
#[async_trait]
pub trait QuoteService: Send + Sync {
    /// Obtain and hold a session token.
    async fn authenticate(&self) -> Result<(), QuoteError>;

    /// Fetch registration data for a CPF. `Ok(None)` means the partner
    /// has no usable record — callers fall back to collected fields.
    async fn registration_data(&self, document: &str)
    -> Result<Option<Registration>, QuoteError>;

    /// Resolve a named agreement (e.g. "INSS") to its id.
    async fn agreement_id(&self, name: &str) -> Result<Option<i64>, QuoteError>;

    /// List contracts eligible for refinancing.
    async fn refin_contracts(
        &self,
        document: &str,
        agreement_id: i64,
    ) -> Result<Vec<Contract>, QuoteError>;

    /// Simulate refinancing one contract.
    async fn simulate_refin(
        &self,
        request: &SimulationRequest,
        contract: &Contract,
    ) -> Result<Simulation, QuoteError>;
}

// ── HTTP client ─────────────────────────────────────────────────────

/// Real client over the Safra correspondent REST API.
pub struct SafraClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    password: String,
    token: RwLock<Option<String>>,
}

impl SafraClient {
    pub fn new(config: &SafraConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.expose_secret().to_string(),
            token: RwLock::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn require_token(&self) -> Result<String, QuoteError> {
        self.token
            .read()
            .await
            .clone()
            .ok_or(QuoteError::NotAuthenticated)
    }

    /// Send a request and decode the body, applying the status-code
    /// taxonomy. An empty body decodes to `T::default()`.
    async fn execute<T>(&self, request: reqwest::RequestBuilder) -> Result<T, QuoteError>
    where
        T: DeserializeOwned + Default,
    {
        let response = request
            .send()
            .await
            .map_err(|e| QuoteError::Network(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(QuoteError::Auth);
        }
        if status.is_server_error() {
            return Err(QuoteError::Server {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| QuoteError::Network(e.to_string()))?;
        if body.is_empty() {
            return Ok(T::default());
        }
        serde_json::from_slice(&body).map_err(|e| QuoteError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl QuoteService for SafraClient {
    async fn authenticate(&self) -> Result<(), QuoteError> {
        debug!("Authenticating against the Safra API");
        let payload = serde_json::json!({
            "username": self.username,
            "password": self.password,
        });
        let response: TokenResponse = self
            .execute(self.http.post(self.endpoint("Token")).json(&payload))
            .await?;

        let token = response
            .access_token
            .or(response.token)
            .filter(|t| !t.is_empty())
            .ok_or(QuoteError::Auth)?;

        *self.token.write().await = Some(token);
        info!("Safra authentication succeeded");
        Ok(())
    }

    async fn registration_data(
        &self,
        document: &str,
    ) -> Result<Option<Registration>, QuoteError> {
        let token = self.require_token().await?;
        let rows: Vec<RegistrationRow> = self
            .execute(
                self.http
                    .get(self.endpoint(&format!("ContratosDadosCadastrais/cpf/{document}")))
                    .bearer_auth(token),
            )
            .await?;

        let registration = rows.into_iter().find_map(|row| {
            let sex = row.sex?.chars().next()?.to_ascii_uppercase().to_string();
            let birth_date = row.birth_date?;
            Some(Registration { birth_date, sex })
        });

        if registration.is_none() {
            warn!(document, "No usable registration data from the partner");
        }
        Ok(registration)
    }

    async fn agreement_id(&self, name: &str) -> Result<Option<i64>, QuoteError> {
        let token = self.require_token().await?;
        let rows: Vec<AgreementRow> = self
            .execute(
                self.http
                    .get(self.endpoint("Convenio"))
                    .query(&[("nome", name)])
                    .bearer_auth(token),
            )
            .await?;

        let id = rows
            .into_iter()
            .find(|row| row.name.eq_ignore_ascii_case(name))
            .and_then(|row| row.id);
        debug!(name, ?id, "Agreement lookup");
        Ok(id)
    }

    async fn refin_contracts(
        &self,
        document: &str,
        agreement_id: i64,
    ) -> Result<Vec<Contract>, QuoteError> {
        let token = self.require_token().await?;
        let contracts: Vec<Contract> = self
            .execute(
                self.http
                    .get(self.endpoint(&format!("Contratos/{document}/{agreement_id}/Refin")))
                    .bearer_auth(token),
            )
            .await?;
        info!(count = contracts.len(), "Refinancable contracts fetched");
        Ok(contracts)
    }

    async fn simulate_refin(
        &self,
        request: &SimulationRequest,
        contract: &Contract,
    ) -> Result<Simulation, QuoteError> {
        let token = self.require_token().await?;
        debug!(contract_id = contract.id, "Running refinancing simulation");

        let payload = SimulationPayload {
            agreement_id: request.agreement_id,
            document: request.document,
            enrollment: contract.enrollment.as_deref(),
            is_quote: true,
            refins: vec![RefinRef {
                contract_id: contract.id,
            }],
            birth_date: request.birth_date.as_deref(),
            sex: request.sex.as_deref(),
            employment_status: request.employment_status,
        };

        self.execute(
            self.http
                .post(self.endpoint("Calculo/Refin"))
                .bearer_auth(token)
                .json(&payload),
        )
        .await
    }
}

// ── Tests ───────────────────────────────────────────────────────────
