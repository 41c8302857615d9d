//! Tool declarations and the dispatch table.
//!
//! The model addresses tools by wire name; [`ToolName`] is the exhaustive
//! set this build dispatches. A requested name outside it is a schema
//! mismatch and propagates as [`CompanionError::UnknownTool`] rather than
//! being fed back to the model.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;

use crate::backend::Collaborators;
use crate::error::{CompanionError, Result};

/// A tool invocation requested by the model. The name stays a string
/// until dispatch so unknown requests can be reported verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub args: Value,
}

/// The dispatchable tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    GetCalendarEvents,
    AddCalendarEvent,
    GetHrvStatus,
    NotifyDoctor,
}

impl ToolName {
    /// Resolve a wire name.
    ///
    /// # Errors
    ///
    /// Returns `CompanionError::UnknownTool` for any name outside the table.
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "getCalendarEvents" => Ok(Self::GetCalendarEvents),
            "addCalendarEvent" => Ok(Self::AddCalendarEvent),
            "getHRVStatus" => Ok(Self::GetHrvStatus),
            "notifyDoctor" => Ok(Self::NotifyDoctor),
            other => Err(CompanionError::UnknownTool(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GetCalendarEvents => "getCalendarEvents",
            Self::AddCalendarEvent => "addCalendarEvent",
            Self::GetHrvStatus => "getHRVStatus",
            Self::NotifyDoctor => "notifyDoctor",
        }
    }
}

/// The lone calendar-read declaration, advertised during the proactive
/// check so the model can only inspect the schedule, not act on it.
pub fn calendar_read_declaration() -> Value {
    json!([{
        "name": "getCalendarEvents",
        "description": "Get the user's calendar events for today to understand their schedule and potential stressors.",
        "parameters": {"type": "OBJECT", "properties": {}}
    }])
}

/// Function declarations advertised to the model.
pub fn declarations() -> Value {
    json!([
        {
            "name": "getCalendarEvents",
            "description": "Get the user's calendar events for today to understand their schedule and potential stressors.",
            "parameters": {"type": "OBJECT", "properties": {}}
        },
        {
            "name": "addCalendarEvent",
            "description": "Add a new event to the user's calendar, such as a break, meditation session, or appointment.",
            "parameters": {
                "type": "OBJECT",
                "properties": {
                    "title": {"type": "STRING", "description": "Title of the event."},
                    "startTime": {"type": "STRING", "description": "ISO-8601 start time."},
                    "endTime": {"type": "STRING", "description": "ISO-8601 end time."},
                    "description": {"type": "STRING", "description": "Optional event details."}
                },
                "required": ["title", "startTime", "endTime"]
            }
        },
        {
            "name": "getHRVStatus",
            "description": "Read the user's current heart rate variability status from their wearable to gauge physiological stress.",
            "parameters": {"type": "OBJECT", "properties": {}}
        },
        {
            "name": "notifyDoctor",
            "description": "Notify the user's registered doctor. Only use this if the user is in distress and agrees to it.",
            "parameters": {
                "type": "OBJECT",
                "properties": {
                    "summary": {"type": "STRING", "description": "Short summary of the situation."}
                },
                "required": ["summary"]
            }
        }
    ])
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddEventArgs {
    title: String,
    start_time: String,
    end_time: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Deserialize)]
struct NotifyDoctorArgs {
    summary: String,
}

/// Execute a tool call against the external collaborators.
///
/// # Errors
///
/// `UnknownTool` for a name outside the table, `ToolParse` for arguments
/// that do not match the declaration, `Service` for collaborator failures.
pub async fn dispatch(call: &ToolCall, collaborators: &Collaborators) -> Result<Value> {
    let name = ToolName::parse(&call.name)?;
    info!(tool = name.as_str(), "dispatching tool call");
    match name {
        ToolName::GetCalendarEvents => {
            let events = collaborators.calendar.list_events().await?;
            serde_json::to_value(&events)
                .map_err(|e| CompanionError::ToolParse(format!("event serialization: {e}")))
        }
        ToolName::AddCalendarEvent => {
            let args: AddEventArgs = parse_args(&call.args)?;
            let receipt = collaborators
                .calendar
                .add_event(
                    &args.title,
                    &args.start_time,
                    &args.end_time,
                    args.description.as_deref(),
                )
                .await?;
            serde_json::to_value(&receipt)
                .map_err(|e| CompanionError::ToolParse(format!("receipt serialization: {e}")))
        }
        ToolName::GetHrvStatus => {
            let status = collaborators.wearable.hrv_status().await?;
            Ok(json!({"status": status}))
        }
        ToolName::NotifyDoctor => {
            let args: NotifyDoctorArgs = parse_args(&call.args)?;
            let receipt = collaborators.emergency.notify(&args.summary).await?;
            serde_json::to_value(&receipt)
                .map_err(|e| CompanionError::ToolParse(format!("receipt serialization: {e}")))
        }
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(args: &Value) -> Result<T> {
    serde_json::from_value(args.clone())
        .map_err(|e| CompanionError::ToolParse(format!("bad tool arguments: {e}")))
}
