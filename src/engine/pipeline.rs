//! Quote pipeline — chains the partner API operations once all four
//! fields are collected and renders the outcome as one WhatsApp text.
//!
//! Failure handling is tiered: an authentication failure aborts the
//! run with an apology, an agreement lookup that fails or finds
//! nothing reads as the plan being unavailable, a contract listing
//! that fails or comes back empty reads as no opportunities, and a
//! failed simulation for one contract only marks that contract's
//! block while the rest still render.

use tracing::{info, warn};

use crate::cpf;
use crate::engine::replies;
use crate::safra::{QuoteService, SimulationRequest, INSS_AGREEMENT};

/// Everything the pipeline needs, snapshotted from the conversation.
#[derive(Debug, Clone)]
pub struct QuoteContext {
    /// Cleaned 11-digit CPF.
    pub document: String,
    /// Collected birth date, `YYYY-MM-DDT00:00:00`.
    pub birth_date: Option<String>,
    /// Collected sex code, `M` or `F`.
    pub sex: Option<String>,
    /// Benefit status option, 1 to 3.
    pub employment_status: i32,
}

/// Run the full quote flow and produce the final reply text.
///
/// Never returns an error: every failure mode has a user-facing
/// rendering.
pub async fn run(service: &dyn QuoteService, ctx: &QuoteContext) -> String {
    info!(document = %ctx.document, "Starting full quote lookup");

    if let Err(e) = service.authenticate().await {
        warn!(error = %e, "Quote aborted: authentication failed");
        return replies::CONNECTIVITY_FAILURE.to_string();
    }

    // Partner registration data wins over what we collected in chat.
    let (birth_date, sex) = match service.registration_data(&ctx.document).await {
        Ok(Some(reg)) => {
            info!("Using partner registration data");
            (Some(reg.birth_date), Some(reg.sex))
        }
        Ok(None) => {
            info!("Partner has no registration data, using collected fields");
            (ctx.birth_date.clone(), ctx.sex.clone())
        }
        Err(e) => {
            warn!(error = %e, "Registration lookup failed, using collected fields");
            (ctx.birth_date.clone(), ctx.sex.clone())
        }
    };

    // A lookup error and an absent agreement read the same to the user.
    let agreement_id = match service.agreement_id(INSS_AGREEMENT).await {
        Ok(Some(id)) => id,
        Ok(None) => {
            warn!("Quote aborted: INSS agreement not found");
            return replies::AGREEMENT_NOT_FOUND.to_string();
        }
        Err(e) => {
            warn!(error = %e, "Quote aborted: agreement lookup failed");
            return replies::AGREEMENT_NOT_FOUND.to_string();
        }
    };

    let formatted = cpf::format(&ctx.document);

    // Likewise a failed listing reads as no opportunities found.
    let contracts = match service.refin_contracts(&ctx.document, agreement_id).await {
        Ok(contracts) => contracts,
        Err(e) => {
            warn!(error = %e, "Contract listing failed");
            return replies::no_contracts(&formatted);
        }
    };
    if contracts.is_empty() {
        return replies::no_contracts(&formatted);
    }

    let document_number: i64 = match ctx.document.parse() {
        Ok(n) => n,
        Err(_) => {
            // Unreachable for a validated CPF, but never panic on it.
            warn!(document = %ctx.document, "CPF did not parse as a number");
            return replies::CONNECTIVITY_FAILURE.to_string();
        }
    };
    let request = SimulationRequest {
        document: document_number,
        agreement_id,
        employment_status: ctx.employment_status,
        birth_date,
        sex,
    };

    let mut message = replies::results_header(&formatted, contracts.len());
    for contract in &contracts {
        message.push_str(&replies::contract_block_header(
            contract.id,
            contract.installment,
        ));
        match service.simulate_refin(&request, contract).await {
            Ok(simulation) if !simulation.offers.is_empty() => {
                message.push_str(replies::OFFERS_LABEL);
                for offer in &simulation.offers {
                    message.push_str(&replies::offer_line(offer.term, offer.payout));
                }
            }
            Ok(simulation) if !simulation.rejections.is_empty() => {
                message.push_str(&replies::ineligible_lines(&simulation.rejections[0]));
            }
            Ok(_) => {
                message.push_str(replies::SIMULATION_FAILED_LINES);
            }
            Err(e) => {
                warn!(contract_id = contract.id, error = %e, "Simulation failed");
                message.push_str(replies::SIMULATION_FAILED_LINES);
            }
        }
    }
    message.push_str(replies::results_footer());
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    use crate::error::QuoteError;
    use crate::safra::{Contract, Offer, Registration, Simulation};

    /// Scriptable stand-in for the partner API.
    #[derive(Default)]
    struct StubQuotes {
        fail_auth: bool,
        registration: Option<Registration>,
        registration_error: bool,
        agreement: Option<i64>,
        agreement_error: bool,
        contracts: Vec<Contract>,
        contracts_error: bool,
        simulations: Mutex<Vec<Result<Simulation, QuoteError>>>,
        requests_seen: Mutex<Vec<SimulationRequest>>,
    }

    #[async_trait]
    impl QuoteService for StubQuotes {
        async fn authenticate(&self) -> Result<(), QuoteError> {
            if self.fail_auth {
                Err(QuoteError::Auth)
            } else {
                Ok(())
            }
        }

        async fn registration_data(
            &self,
            _document: &str,
        ) -> Result<Option<Registration>, QuoteError> {
            if self.registration_error {
                Err(QuoteError::Server { status: 500 })
            } else {
                Ok(self.registration.clone())
            }
        }

        async fn agreement_id(&self, _name: &str) -> Result<Option<i64>, QuoteError> {
            if self.agreement_error {
                Err(QuoteError::Server { status: 500 })
            } else {
                Ok(self.agreement)
            }
        }

        async fn refin_contracts(
            &self,
            _document: &str,
            _agreement_id: i64,
        ) -> Result<Vec<Contract>, QuoteError> {
            if self.contracts_error {
                Err(QuoteError::Network("timeout".into()))
            } else {
                Ok(self.contracts.clone())
            }
        }

        async fn simulate_refin(
            &self,
            request: &SimulationRequest,
            _contract: &Contract,
        ) -> Result<Simulation, QuoteError> {
            self.requests_seen.lock().unwrap().push(request.clone());
            self.simulations
                .lock()
                .unwrap()
                .remove(0)
        }
    }

    fn ctx() -> QuoteContext {
        QuoteContext {
            document: "11144477735".to_string(),
            birth_date: Some("1985-03-15T00:00:00".to_string()),
            sex: Some("M".to_string()),
            employment_status: 2,
        }
    }

    fn contract(id: i64, installment: rust_decimal::Decimal) -> Contract {
        Contract {
            id,
            enrollment: Some("123456".to_string()),
            installment,
        }
    }

    #[tokio::test]
    async fn auth_failure_yields_connectivity_apology() {
        let stub = StubQuotes {
            fail_auth: true,
            ..Default::default()
        };
        assert_eq!(run(&stub, &ctx()).await, replies::CONNECTIVITY_FAILURE);
    }

    #[tokio::test]
    async fn missing_agreement_yields_plan_not_found() {
        let stub = StubQuotes {
            agreement: None,
            ..Default::default()
        };
        assert_eq!(run(&stub, &ctx()).await, replies::AGREEMENT_NOT_FOUND);
    }

    #[tokio::test]
    async fn agreement_lookup_error_reads_as_plan_not_found() {
        let stub = StubQuotes {
            agreement_error: true,
            ..Default::default()
        };
        assert_eq!(run(&stub, &ctx()).await, replies::AGREEMENT_NOT_FOUND);
    }

    #[tokio::test]
    async fn contract_listing_error_reads_as_no_opportunities() {
        let stub = StubQuotes {
            agreement: Some(7),
            contracts_error: true,
            ..Default::default()
        };
        let reply = run(&stub, &ctx()).await;
        assert!(reply.contains("Nenhuma oportunidade"));
        assert!(reply.contains("111.444.777-35"));
    }

    #[tokio::test]
    async fn no_contracts_yields_polite_empty_result() {
        let stub = StubQuotes {
            agreement: Some(7),
            ..Default::default()
        };
        let reply = run(&stub, &ctx()).await;
        assert!(reply.contains("111.444.777-35"));
        assert!(reply.contains("Nenhuma oportunidade"));
        assert!(reply.contains("Digite *oi*"));
    }

    #[tokio::test]
    async fn offers_render_per_contract_with_count_header() {
        let stub = StubQuotes {
            agreement: Some(7),
            contracts: vec![contract(42, dec!(450.00))],
            simulations: Mutex::new(vec![Ok(Simulation {
                offers: vec![
                    Offer {
                        term: 24,
                        payout: dec!(2500.00),
                    },
                    Offer {
                        term: 36,
                        payout: dec!(3200.00),
                    },
                ],
                rejections: vec![],
            })]),
            ..Default::default()
        };

        let reply = run(&stub, &ctx()).await;
        assert!(reply.contains("Encontramos 1 oportunidade(s)"));
        assert!(reply.contains("*Contrato ID: 42*"));
        assert!(reply.contains("*Parcela Atual:* R$ 450.00"));
        assert!(reply.contains("Em *24 meses* ➡ *Troco de R$ 2500.00*"));
        assert!(reply.contains("Em *36 meses*"));
    }

    #[tokio::test]
    async fn rejection_shows_first_reason_only() {
        let stub = StubQuotes {
            agreement: Some(7),
            contracts: vec![contract(1, dec!(320.00))],
            simulations: Mutex::new(vec![Ok(Simulation {
                offers: vec![],
                rejections: vec!["Margem insuficiente".into(), "Outra crítica".into()],
            })]),
            ..Default::default()
        };

        let reply = run(&stub, &ctx()).await;
        assert!(reply.contains("*Status:* Não elegível"));
        assert!(reply.contains("*Motivo:* Margem insuficiente"));
        assert!(!reply.contains("Outra crítica"));
    }

    #[tokio::test]
    async fn one_failed_simulation_does_not_sink_the_rest() {
        let stub = StubQuotes {
            agreement: Some(7),
            contracts: vec![contract(1, dec!(100.00)), contract(2, dec!(200.00))],
            simulations: Mutex::new(vec![
                Err(QuoteError::Network("timeout".into())),
                Ok(Simulation {
                    offers: vec![Offer {
                        term: 30,
                        payout: dec!(1800.00),
                    }],
                    rejections: vec![],
                }),
            ]),
            ..Default::default()
        };

        let reply = run(&stub, &ctx()).await;
        assert!(reply.contains("Não foi possível simular este contrato"));
        assert!(reply.contains("Em *30 meses*"));
    }

    #[tokio::test]
    async fn partner_registration_data_wins_over_collected() {
        let stub = StubQuotes {
            agreement: Some(7),
            registration: Some(Registration {
                birth_date: "1990-12-01T00:00:00".to_string(),
                sex: "F".to_string(),
            }),
            contracts: vec![contract(1, dec!(100.00))],
            simulations: Mutex::new(vec![Ok(Simulation::default())]),
            ..Default::default()
        };

        run(&stub, &ctx()).await;
        let requests = stub.requests_seen.lock().unwrap();
        assert_eq!(requests[0].birth_date.as_deref(), Some("1990-12-01T00:00:00"));
        assert_eq!(requests[0].sex.as_deref(), Some("F"));
        assert_eq!(requests[0].document, 11144477735);
        assert_eq!(requests[0].employment_status, 2);
    }

    #[tokio::test]
    async fn registration_lookup_error_falls_back_to_collected() {
        let stub = StubQuotes {
            agreement: Some(7),
            registration_error: true,
            contracts: vec![contract(1, dec!(100.00))],
            simulations: Mutex::new(vec![Ok(Simulation::default())]),
            ..Default::default()
        };

        run(&stub, &ctx()).await;
        let requests = stub.requests_seen.lock().unwrap();
        assert_eq!(requests[0].birth_date.as_deref(), Some("1985-03-15T00:00:00"));
        assert_eq!(requests[0].sex.as_deref(), Some("M"));
    }
}
