//! Command-line grammar of the chat surface.
//!
//! Parsing is pure: a line becomes a [`Command`], which is then mapped to a
//! tool call. Arguments missing from a command produce [`Command::Usage`]
//! so the user gets the right usage text back instead of an error.

use crm_bridge_core::PhoneNumber;
use serde_json::{Map, Value, json};

use super::tokenize::{Token, tokenize};
use crate::tools::ToolName;

/// Page size when a list command has no limit.
pub const DEFAULT_CHAT_LIMIT: u32 = 5;

/// Largest page a chat list command will request.
pub const MAX_CHAT_LIMIT: u32 = 20;

/// Prefix marking a `/nova_oportunidade` slot as a pipeline id.
const PIPELINE_ID_PREFIX: &str = "Pipeline_";

/// Prefix marking a `/nova_oportunidade` slot as a stage id.
const STAGE_ID_PREFIX: &str = "Stage_";

/// Which usage text to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Usage {
    CreateContact,
    SendSms,
    Sale,
    NewOpportunity,
    NaturalOpportunity,
    ContactName,
}

/// Pipeline or stage designation from a chat slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Designation {
    Id(String),
    Name(String),
}

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    CreateContact {
        first_name: String,
        last_name: Option<String>,
        email: Option<String>,
        phone: Option<String>,
    },
    ListContacts { limit: u32 },
    ListConversations { limit: u32 },
    ListOpportunities { limit: u32 },
    ListPipelines,
    SendSms { contact_id: String, message: String },
    /// `/venda "Título" "Cliente" [valor]`
    Sale {
        title: String,
        contact_name: String,
        value: Option<String>,
    },
    /// `/nova_oportunidade "Título" "Cliente" [email] [telefone] [PIPELINE] [STAGE] [valor]`
    NewOpportunity {
        title: String,
        contact_name: String,
        email: Option<String>,
        phone: Option<String>,
        pipeline: Option<Designation>,
        stage: Option<Designation>,
        value: Option<String>,
    },
    /// `/criar_oportunidade Nome... Telefone [Email] [Pipeline] [Stage...] [Valor]`
    NaturalOpportunity {
        name: String,
        phone: Option<String>,
        email: Option<String>,
        pipeline: Option<String>,
        stage: Option<String>,
        value: Option<String>,
    },
    /// Free text asking how to create an opportunity.
    OpportunityHelp,
    Usage(Usage),
    Unknown,
}

impl Command {
    /// Parse one line of chat input.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if !line.starts_with('/') {
            return parse_free_text(line);
        }

        let tokens = tokenize(line);
        let Some((Token::Word(head), args)) = tokens.split_first() else {
            return Self::Unknown;
        };
        // Telegram-style `/cmd@botname`.
        let name = head
            .trim_start_matches('/')
            .split('@')
            .next()
            .unwrap_or_default()
            .to_lowercase();

        match name.as_str() {
            "start" => Self::Start,
            "help" | "ajuda" => Self::Help,
            "criar_contato" => parse_create_contact(args),
            "buscar_contatos" => Self::ListContacts {
                limit: chat_limit(args),
            },
            "listar_conversas" => Self::ListConversations {
                limit: chat_limit(args),
            },
            "buscar_oportunidades" => Self::ListOpportunities {
                limit: chat_limit(args),
            },
            "listar_pipelines" => Self::ListPipelines,
            "enviar_sms" => parse_send_sms(args),
            "venda" => parse_sale(args),
            "nova_oportunidade" => parse_new_opportunity(args),
            "criar_oportunidade" => parse_natural_opportunity(args),
            _ => Self::Unknown,
        }
    }

    /// The tool call this command stands for, if any.
    #[must_use]
    pub fn tool_call(&self) -> Option<(ToolName, Value)> {
        let call = match self {
            Self::CreateContact {
                first_name,
                last_name,
                email,
                phone,
            } => (
                ToolName::CreateContact,
                object([
                    ("firstName", Some(first_name.clone())),
                    ("lastName", last_name.clone()),
                    ("email", email.clone()),
                    ("phone", phone.clone()),
                ]),
            ),
            Self::ListContacts { limit } => (ToolName::GetContacts, json!({"limit": limit})),
            Self::ListConversations { limit } => {
                (ToolName::GetConversations, json!({"limit": limit}))
            }
            Self::ListOpportunities { limit } => {
                (ToolName::GetOpportunities, json!({"limit": limit}))
            }
            Self::ListPipelines => (ToolName::GetPipelines, json!({})),
            Self::SendSms {
                contact_id,
                message,
            } => (
                ToolName::SendSms,
                json!({"contactId": contact_id, "message": message}),
            ),
            Self::Sale {
                title,
                contact_name,
                value,
            } => (
                ToolName::CreateOpportunity,
                object([
                    ("mode", Some("names_resolved".to_string())),
                    ("title", Some(title.clone())),
                    ("contact_name", Some(contact_name.clone())),
                    ("value", value.clone()),
                ]),
            ),
            Self::NewOpportunity {
                title,
                contact_name,
                email,
                phone,
                pipeline,
                stage,
                value,
            } => {
                let (pipeline_id, pipeline_name) = split_designation(pipeline.as_ref());
                let (stage_id, stage_name) = split_designation(stage.as_ref());
                (
                    ToolName::CreateOpportunity,
                    object([
                        ("mode", Some("names_resolved".to_string())),
                        ("title", Some(title.clone())),
                        ("contact_name", Some(contact_name.clone())),
                        ("contact_email", email.clone()),
                        ("contact_phone", phone.clone()),
                        ("pipeline_id", pipeline_id),
                        ("pipeline_name", pipeline_name),
                        ("stage_id", stage_id),
                        ("stage_name", stage_name),
                        ("value", value.clone()),
                    ]),
                )
            }
            Self::NaturalOpportunity {
                name,
                phone,
                email,
                pipeline,
                stage,
                value,
            } => {
                let mut args = object([
                    ("mode", Some("natural_language".to_string())),
                    ("contact_name", Some(name.clone())),
                    ("contact_phone", phone.clone()),
                    ("contact_email", email.clone()),
                    ("pipeline_name", pipeline.clone()),
                    ("stage_name", stage.clone()),
                    ("value", value.clone()),
                ]);
                if let Some(fields) = args.as_object_mut() {
                    fields.insert("force_new".to_string(), Value::Bool(true));
                }
                (ToolName::CreateOpportunity, args)
            }
            Self::Start
            | Self::Help
            | Self::OpportunityHelp
            | Self::Usage(_)
            | Self::Unknown => return None,
        };
        Some(call)
    }
}

/// JSON object of the fields that are set.
fn object<const N: usize>(fields: [(&str, Option<String>); N]) -> Value {
    let map: Map<String, Value> = fields
        .into_iter()
        .filter_map(|(key, value)| value.map(|v| (key.to_string(), Value::String(v))))
        .collect();
    Value::Object(map)
}

fn split_designation(designation: Option<&Designation>) -> (Option<String>, Option<String>) {
    match designation {
        Some(Designation::Id(id)) => (Some(id.clone()), None),
        Some(Designation::Name(name)) => (None, Some(name.clone())),
        None => (None, None),
    }
}

fn designation(token: Option<&Token>, id_prefix: &str) -> Option<Designation> {
    let text = token?.text()?;
    Some(match text.strip_prefix(id_prefix) {
        Some(id) if !id.is_empty() => Designation::Id(id.to_string()),
        _ => Designation::Name(text.to_string()),
    })
}

fn word(token: Option<&Token>) -> Option<String> {
    token.and_then(Token::text).map(String::from)
}

/// First argument as a limit when it is all digits, capped at
/// [`MAX_CHAT_LIMIT`].
fn chat_limit(args: &[Token]) -> u32 {
    args.first()
        .and_then(Token::text)
        .filter(|t| !t.is_empty() && t.chars().all(|c| c.is_ascii_digit()))
        .and_then(|t| t.parse::<u32>().ok())
        .map_or(DEFAULT_CHAT_LIMIT, |n| n.clamp(1, MAX_CHAT_LIMIT))
}

/// Whether a token is a monetary value (`2500`, `1.500,00`, `1800.5`).
fn is_amount(text: &str) -> bool {
    let digits: String = text.chars().filter(|c| *c != ',' && *c != '.').collect();
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Whether a token is made of digits once phone separators are removed.
fn is_phone_digits(text: &str) -> bool {
    let digits: String = text
        .chars()
        .filter(|c| !matches!(c, '+' | '-' | ' ' | '(' | ')'))
        .collect();
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

fn parse_create_contact(args: &[Token]) -> Command {
    let Some(first_name) = word(args.first()) else {
        return Command::Usage(Usage::CreateContact);
    };
    let mut last_name = None;
    let mut email = None;
    let mut phone = None;

    for text in args.iter().skip(1).filter_map(Token::text) {
        if text.contains('@') {
            email = Some(text.to_string());
        } else if is_phone_digits(text) {
            phone = Some(text.to_string());
        } else if last_name.is_none() {
            last_name = Some(text.to_string());
        }
    }

    Command::CreateContact {
        first_name,
        last_name,
        email,
        phone,
    }
}

fn parse_send_sms(args: &[Token]) -> Command {
    let contact_id = word(args.first());
    let message = args
        .iter()
        .skip(1)
        .filter_map(Token::text)
        .collect::<Vec<_>>()
        .join(" ");
    match contact_id {
        Some(contact_id) if !message.trim().is_empty() => Command::SendSms {
            contact_id,
            message,
        },
        _ => Command::Usage(Usage::SendSms),
    }
}

fn parse_sale(args: &[Token]) -> Command {
    match (word(args.first()), word(args.get(1))) {
        (Some(title), Some(contact_name)) => Command::Sale {
            title,
            contact_name,
            value: word(args.get(2)),
        },
        _ => Command::Usage(Usage::Sale),
    }
}

fn parse_new_opportunity(args: &[Token]) -> Command {
    match (word(args.first()), word(args.get(1))) {
        (Some(title), Some(contact_name)) => Command::NewOpportunity {
            title,
            contact_name,
            email: word(args.get(2)),
            phone: word(args.get(3)),
            pipeline: designation(args.get(4), PIPELINE_ID_PREFIX),
            stage: designation(args.get(5), STAGE_ID_PREFIX),
            value: word(args.get(6)),
        },
        _ => Command::Usage(Usage::NewOpportunity),
    }
}

/// `Nome... Telefone [Email] [Pipeline] [Stage...] [Valor]`: the name runs
/// until the first token of at least eight digits (the phone). After the
/// phone, an `@` token or an empty slot is the email, the next token is the
/// pipeline, a trailing amount is the value and the rest is the stage.
fn parse_natural_opportunity(args: &[Token]) -> Command {
    if args.len() < 3 {
        return Command::Usage(Usage::NaturalOpportunity);
    }

    let mut rest = args.iter().peekable();
    let mut name_parts = Vec::new();
    let mut phone = None;
    for token in rest.by_ref() {
        match token.text() {
            Some(text) if PhoneNumber::looks_like(text) => {
                phone = Some(text.to_string());
                break;
            }
            Some(text) => name_parts.push(text),
            None => {}
        }
    }
    if name_parts.is_empty() {
        return Command::Usage(Usage::NaturalOpportunity);
    }

    let mut email = None;
    if let Some(next) = rest.peek().copied() {
        match next.text() {
            Some(text) if text.contains('@') => {
                email = Some(text.to_string());
                rest.next();
            }
            None => {
                rest.next();
            }
            Some(_) => {}
        }
    }

    let pipeline = rest.next().and_then(Token::text).map(str::to_lowercase);

    let mut remaining: Vec<&str> = rest.filter_map(Token::text).collect();
    let value = match remaining.last() {
        Some(last) if is_amount(last) => remaining.pop().map(String::from),
        _ => None,
    };
    let stage = Some(remaining.join(" ").to_lowercase()).filter(|s| !s.is_empty());

    Command::NaturalOpportunity {
        name: name_parts.join(" "),
        phone,
        email,
        pipeline,
        stage,
        value,
    }
}

const CREATE_CONTACT_KEYWORDS: &[&str] = &["criar contato", "novo contato", "adicionar contato"];
const LIST_CONTACTS_KEYWORDS: &[&str] = &["buscar contatos", "listar contatos", "ver contatos"];
const CONVERSATION_KEYWORDS: &[&str] = &["ver conversas", "listar conversas", "conversas"];
const CREATE_OPPORTUNITY_KEYWORDS: &[&str] =
    &["criar oportunidade", "nova oportunidade", "adicionar oportunidade"];
const OPPORTUNITY_KEYWORDS: &[&str] = &[
    "buscar oportunidades",
    "listar oportunidades",
    "ver oportunidades",
    "oportunidades",
];
const PIPELINE_KEYWORDS: &[&str] = &["ver pipelines", "listar pipelines", "pipelines"];

fn parse_free_text(line: &str) -> Command {
    let lower = line.to_lowercase();
    let mentions = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    if mentions(CREATE_CONTACT_KEYWORDS) {
        return contact_name_after_keyword(line).map_or(
            Command::Usage(Usage::ContactName),
            |first_name| Command::CreateContact {
                first_name,
                last_name: None,
                email: None,
                phone: None,
            },
        );
    }
    if mentions(LIST_CONTACTS_KEYWORDS) {
        return Command::ListContacts {
            limit: DEFAULT_CHAT_LIMIT,
        };
    }
    if mentions(CONVERSATION_KEYWORDS) {
        return Command::ListConversations {
            limit: DEFAULT_CHAT_LIMIT,
        };
    }
    if mentions(CREATE_OPPORTUNITY_KEYWORDS) {
        return Command::OpportunityHelp;
    }
    if mentions(OPPORTUNITY_KEYWORDS) {
        return Command::ListOpportunities {
            limit: DEFAULT_CHAT_LIMIT,
        };
    }
    if mentions(PIPELINE_KEYWORDS) {
        return Command::ListPipelines;
    }
    Command::Unknown
}

/// The letters and spaces following the word `contato`, with the caller's
/// capitalisation.
fn contact_name_after_keyword(line: &str) -> Option<String> {
    let lower = line.to_lowercase();
    let start = lower.find("contato")? + "contato".len();
    // Lowercasing can change byte lengths; fall back to the lowered text.
    let tail = if lower.len() == line.len() {
        line.get(start..)?
    } else {
        lower.get(start..)?
    };
    if !tail.starts_with(char::is_whitespace) {
        return None;
    }
    let name: String = tail
        .trim_start()
        .chars()
        .take_while(|c| c.is_alphabetic() || c.is_whitespace())
        .collect();
    Some(name.trim().to_string()).filter(|n| !n.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_create_contact_fields_by_shape() {
        assert_eq!(
            Command::parse("/criar_contato João 11999999999 joao@email.com"),
            Command::CreateContact {
                first_name: "João".into(),
                last_name: None,
                email: Some("joao@email.com".into()),
                phone: Some("11999999999".into()),
            }
        );
        assert_eq!(
            Command::parse("/criar_contato"),
            Command::Usage(Usage::CreateContact)
        );
    }

    #[test]
    fn test_list_limits() {
        assert_eq!(
            Command::parse("/buscar_contatos"),
            Command::ListContacts { limit: 5 }
        );
        assert_eq!(
            Command::parse("/buscar_contatos 50"),
            Command::ListContacts { limit: 20 }
        );
        assert_eq!(
            Command::parse("/listar_conversas 3"),
            Command::ListConversations { limit: 3 }
        );
        assert_eq!(
            Command::parse("/buscar_oportunidades muitas"),
            Command::ListOpportunities { limit: 5 }
        );
    }

    #[test]
    fn test_send_sms_joins_message() {
        assert_eq!(
            Command::parse(r#"/enviar_sms abc123 "Olá! Como posso ajudar?""#),
            Command::SendSms {
                contact_id: "abc123".into(),
                message: "Olá! Como posso ajudar?".into(),
            }
        );
        assert_eq!(
            Command::parse("/enviar_sms abc123 oi tudo bem"),
            Command::SendSms {
                contact_id: "abc123".into(),
                message: "oi tudo bem".into(),
            }
        );
        assert_eq!(Command::parse("/enviar_sms abc123"), Command::Usage(Usage::SendSms));
    }

    #[test]
    fn test_sale_maps_to_names_mode() {
        let command = Command::parse(r#"/venda "Venda Produto X" "João Silva" 2500"#);
        let (tool, args) = command.tool_call().unwrap();
        assert_eq!(tool, ToolName::CreateOpportunity);
        assert_eq!(
            args,
            json!({
                "mode": "names_resolved",
                "title": "Venda Produto X",
                "contact_name": "João Silva",
                "value": "2500",
            })
        );
    }

    #[test]
    fn test_new_opportunity_prefixed_ids_and_absent_slots() {
        let command = Command::parse(
            r#"/nova_oportunidade "Venda Maria" "Maria Santos" "" "" Pipeline_SjYJh6QYcw6bdK6poVnL proposta 1800"#,
        );
        assert_eq!(
            command,
            Command::NewOpportunity {
                title: "Venda Maria".into(),
                contact_name: "Maria Santos".into(),
                email: None,
                phone: None,
                pipeline: Some(Designation::Id("SjYJh6QYcw6bdK6poVnL".into())),
                stage: Some(Designation::Name("proposta".into())),
                value: Some("1800".into()),
            }
        );
        let (_, args) = command.tool_call().unwrap();
        assert_eq!(args["pipeline_id"], "SjYJh6QYcw6bdK6poVnL");
        assert_eq!(args["stage_name"], "proposta");
        assert!(args.get("contact_email").is_none());
    }

    #[test]
    fn test_natural_opportunity_positions() {
        assert_eq!(
            Command::parse(
                r#"/criar_oportunidade João Silva 11999999999 joao@email.com lead "new lead" 2500"#
            ),
            Command::NaturalOpportunity {
                name: "João Silva".into(),
                phone: Some("11999999999".into()),
                email: Some("joao@email.com".into()),
                pipeline: Some("lead".into()),
                stage: Some("new lead".into()),
                value: Some("2500".into()),
            }
        );
    }

    #[test]
    fn test_natural_opportunity_without_email_or_value() {
        assert_eq!(
            Command::parse(r#"/criar_oportunidade "Carlos Costa" 11777777777 "" Padrão contato"#),
            Command::NaturalOpportunity {
                name: "Carlos Costa".into(),
                phone: Some("11777777777".into()),
                email: None,
                pipeline: Some("padrão".into()),
                stage: Some("contato".into()),
                value: None,
            }
        );
        assert_eq!(
            Command::parse("/criar_oportunidade Ana 11888888888"),
            Command::Usage(Usage::NaturalOpportunity)
        );
    }

    #[test]
    fn test_natural_opportunity_forces_new_contact() {
        let (_, args) = Command::parse("/criar_oportunidade Ana Lima 11888888888 vendas")
            .tool_call()
            .unwrap();
        assert_eq!(args["mode"], "natural_language");
        assert_eq!(args["force_new"], true);
        assert_eq!(args["pipeline_name"], "vendas");
        assert!(args.get("stage_name").is_none());
    }

    #[test]
    fn test_free_text_routing() {
        assert_eq!(
            Command::parse("Criar contato Maria Santos"),
            Command::CreateContact {
                first_name: "Maria Santos".into(),
                last_name: None,
                email: None,
                phone: None,
            }
        );
        assert_eq!(
            Command::parse("criar contato"),
            Command::Usage(Usage::ContactName)
        );
        assert_eq!(
            Command::parse("quero ver conversas"),
            Command::ListConversations { limit: 5 }
        );
        assert_eq!(Command::parse("nova oportunidade"), Command::OpportunityHelp);
        assert_eq!(
            Command::parse("oportunidades"),
            Command::ListOpportunities { limit: 5 }
        );
        assert_eq!(Command::parse("pipelines"), Command::ListPipelines);
        assert_eq!(Command::parse("bom dia"), Command::Unknown);
    }

    #[test]
    fn test_bot_suffix_and_case() {
        assert_eq!(Command::parse("/Help@crm_bot"), Command::Help);
        assert_eq!(Command::parse("/desconhecido"), Command::Unknown);
    }
}
