//! Canonical user-facing texts, Brazilian Portuguese with WhatsApp
//! markdown. Kept in one place so the engine and tests share exact
//! wording.

use rust_decimal::Decimal;

pub const WELCOME: &str = "👋 Olá! Sou seu assistente de consignado do Safra.\n\n\
    Para começar, por favor, envie seu CPF (apenas números).";

pub const HELP: &str = "📖 *Como usar o assistente:*\n\n\
    1️⃣ Digite seu *CPF* (apenas números)\n\
    2️⃣ Informe sua *data de nascimento* (DD/MM/AAAA)\n\
    3️⃣ Informe seu *sexo* (M ou F)\n\
    4️⃣ Escolha a *situação do benefício* (1, 2 ou 3)\n\n\
    • Digite *oi* para iniciar uma nova consulta\n\
    • Digite *ajuda* para ver esta mensagem";

pub const INVALID_DOCUMENT: &str =
    "❌ CPF inválido. Por favor, verifique os 11 dígitos e tente novamente.";

pub const INVALID_BIRTH_DATE: &str =
    "❌ Formato de data inválido. Por favor, use o formato DD/MM/AAAA.\n\nExemplo: 15/03/1985";

pub const INVALID_SEX: &str =
    "❌ Opção inválida. Por favor, digite *M* para Masculino ou *F* para Feminino.";

pub const INVALID_EMPLOYMENT_STATUS: &str =
    "❌ Opção inválida. Por favor, digite 1, 2 ou 3 para a situação do benefício.";

/// Sent before the quote pipeline runs, so the user is not left staring
/// at a silent chat.
pub const WAIT_NOTICE: &str =
    "🔍 Perfeito! Iniciando a consulta completa... Isso pode levar alguns segundos.";

pub const CONNECTIVITY_FAILURE: &str = "Desculpe, não foi possível conectar ao sistema \
    do banco no momento. Tente novamente mais tarde.";

pub const AGREEMENT_NOT_FOUND: &str =
    "Não foi possível encontrar o convênio INSS no sistema.";

const RESTART_PROMPT: &str = "\nDigite *oi* para iniciar uma nova consulta.";

pub fn document_received(formatted: &str) -> String {
    format!(
        "✅ CPF {formatted} recebido!\n\n\
         📅 Agora, por favor, informe sua data de nascimento no formato DD/MM/AAAA.\n\n\
         Exemplo: 15/03/1985"
    )
}

/// Echoes the date exactly as the user typed it.
pub fn birth_date_received(raw: &str) -> String {
    format!(
        "✅ Data de nascimento {raw} recebida!\n\n\
         👤 Agora, por favor, informe seu sexo:\n\n\
         🔹 Digite *M* para Masculino\n\
         🔹 Digite *F* para Feminino"
    )
}

pub fn sex_received(sex: &str) -> String {
    let label = if sex == "M" { "Masculino" } else { "Feminino" };
    format!(
        "✅ Sexo {label} recebido!\n\n\
         💼 Por fim, informe a situação do seu benefício:\n\n\
         1️⃣ - Ativo\n\
         2️⃣ - Inativo/Aposentado\n\
         3️⃣ - Pensionista"
    )
}

pub fn no_contracts(formatted_document: &str) -> String {
    format!(
        "✅ Consulta para o CPF {formatted_document} finalizada.\n\n\
         Nenhuma oportunidade de refinanciamento foi encontrada no momento.\n\
         {RESTART_PROMPT}"
    )
}

pub fn results_header(formatted_document: &str, contract_count: usize) -> String {
    format!(
        "✅ Consulta para o CPF {formatted_document} finalizada!\n\n\
         Encontramos {contract_count} oportunidade(s) de refinanciamento:\n"
    )
}

pub fn results_footer() -> &'static str {
    RESTART_PROMPT
}

pub fn contract_block_header(contract_id: i64, installment: Decimal) -> String {
    format!(
        "\n📄 *Contrato ID: {contract_id}*\n   *Parcela Atual:* R$ {:.2}\n",
        installment
    )
}

pub fn offer_line(term: u32, payout: Decimal) -> String {
    format!("     - Em *{term} meses* ➡ *Troco de R$ {:.2}*\n", payout)
}

pub const OFFERS_LABEL: &str = "   *Opções de Troco Liberado:*\n";

pub fn ineligible_lines(reason: &str) -> String {
    format!("   *Status:* Não elegível\n   *Motivo:* {reason}\n")
}

pub const SIMULATION_FAILED_LINES: &str =
    "   *Status:* Não foi possível simular este contrato.\n";
