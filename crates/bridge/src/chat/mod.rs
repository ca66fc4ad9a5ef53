//! Chat command surface.
//!
//! Turns one line of user text into a tool call and formats the result as
//! a pt-BR reply. Slash commands follow a positional grammar (see
//! [`Command`]); anything else is routed by keyword.

mod command;
mod tokenize;

pub use command::{Command, DEFAULT_CHAT_LIMIT, Designation, MAX_CHAT_LIMIT, Usage};
pub use tokenize::{Token, tokenize};

use tracing::{debug, instrument};

use crate::catalog::Catalog;
use crate::gateway::CrmGateway;
use crate::services::ResolverSettings;
use crate::tools::{ToolExecutor, ToolName};

const WELCOME: &str = "\
🤖 Olá! Sou o assistente do CRM.

Posso buscar contatos, conversas, oportunidades e pipelines, criar contatos \
e oportunidades e enviar SMS.

Use /help para ver todos os comandos.";

const HELP: &str = "\
📖 Comandos disponíveis:

/buscar_contatos [limite] - Lista contatos
/criar_contato Nome [Sobrenome] [email] [telefone] - Cria um contato
/enviar_sms ID mensagem - Envia SMS para um contato
/listar_conversas [limite] - Lista conversas
/buscar_oportunidades [limite] - Lista oportunidades
/listar_pipelines - Lista pipelines e estágios
/venda \"Título\" \"Cliente\" [valor] - Cria uma venda
/nova_oportunidade \"Título\" \"Cliente\" [email] [telefone] [PIPELINE] [STAGE] [valor]
/criar_oportunidade Nome Telefone [Email] [Pipeline] [Stage] [Valor]

Use \"\" para pular um campo opcional. Prefixe com Pipeline_ ou Stage_ para \
informar um ID em /nova_oportunidade.

Também entendo texto livre como \"criar contato Maria Santos\" ou \"ver conversas\".";

const NOT_UNDERSTOOD: &str =
    "🤔 Não entendi o comando. Use `/help` para ver os comandos disponíveis.";

const OPPORTUNITY_HINT: &str = "\
💡 Para criar uma oportunidade use:
/venda \"Título\" \"Cliente\" [valor]
/criar_oportunidade Nome Telefone [Email] [Pipeline] [Stage] [Valor]";

const fn usage_text(usage: Usage) -> &'static str {
    match usage {
        Usage::CreateContact => {
            "❌ Uso: /criar_contato Nome [Sobrenome] [email] [telefone]\n\
             Exemplo: /criar_contato João Silva joao@email.com 11999999999"
        }
        Usage::SendSms => {
            "❌ Uso: /enviar_sms ID_CONTATO mensagem\n\
             Exemplo: /enviar_sms abc123 Olá! Como posso ajudar?"
        }
        Usage::Sale => {
            "❌ Uso: /venda \"Título\" \"Cliente\" [valor]\n\
             Exemplo: /venda \"Venda Produto X\" \"João Silva\" 2500"
        }
        Usage::NewOpportunity => {
            "❌ Uso: /nova_oportunidade \"Título\" \"Cliente\" [email] [telefone] [PIPELINE] [STAGE] [valor]\n\
             Exemplo: /nova_oportunidade \"Venda Maria\" \"Maria Santos\" \"\" \"\" vendas proposta 1800"
        }
        Usage::NaturalOpportunity => {
            "❌ Uso: /criar_oportunidade Nome Telefone [Email] [Pipeline] [Stage] [Valor]\n\
             Exemplo: /criar_oportunidade João Silva 11999999999 joao@email.com lead \"new lead\" 2500"
        }
        Usage::ContactName => "❌ Nome não identificado. Use: 'criar contato Nome Sobrenome'",
    }
}

/// Header shown above a successful result.
const fn header(command: &Command) -> &'static str {
    match command {
        Command::ListContacts { .. } => "📋 Contatos encontrados:",
        Command::ListConversations { .. } => "💬 Conversas encontradas:",
        Command::ListOpportunities { .. } => "💰 Oportunidades encontradas:",
        Command::ListPipelines => "🔄 Pipelines e Estágios:",
        Command::SendSms { .. } => "📱 SMS enviado!",
        Command::CreateContact { .. } => "✅ Contato criado com sucesso!",
        Command::Sale { .. } => "🎉 Venda criada!",
        Command::NewOpportunity { .. } => "💰 Oportunidade criada!",
        Command::NaturalOpportunity { .. } => "🎉 Oportunidade criada!",
        Command::Start
        | Command::Help
        | Command::OpportunityHelp
        | Command::Usage(_)
        | Command::Unknown => "",
    }
}

/// Answers chat lines using the tool executor.
pub struct ChatBot<'a, G> {
    tools: ToolExecutor<'a, G>,
}

impl<'a, G: CrmGateway> ChatBot<'a, G> {
    #[must_use]
    pub const fn new(gateway: &'a G, catalog: &'a Catalog, settings: ResolverSettings) -> Self {
        Self {
            tools: ToolExecutor::new(gateway, catalog, settings),
        }
    }

    /// Reply to one line of user input. Failures become the error text of
    /// the tool call, never an `Err`.
    #[instrument(skip(self, line))]
    pub async fn reply(&self, line: &str) -> String {
        let command = Command::parse(line);
        debug!(?command, "Parsed chat command");

        match &command {
            Command::Start => return WELCOME.to_string(),
            Command::Help => return HELP.to_string(),
            Command::OpportunityHelp => return OPPORTUNITY_HINT.to_string(),
            Command::Usage(usage) => return usage_text(*usage).to_string(),
            Command::Unknown => return NOT_UNDERSTOOD.to_string(),
            _ => {}
        }

        let Some((tool, args)) = command.tool_call() else {
            return NOT_UNDERSTOOD.to_string();
        };
        let output = self.tools.invoke(tool.as_str(), &args).await;
        if output.is_error {
            return output.text;
        }
        format_success(&command, tool, &output.text)
    }
}

fn format_success(command: &Command, tool: ToolName, json: &str) -> String {
    debug!(tool = %tool, "Chat command succeeded");
    format!("{}\n\n```json\n{json}\n```", header(command))
}
