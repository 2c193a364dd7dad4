//! Cohere Command family dialect
//!
//! Cohere models take the conversation as an explicit chat history plus a
//! current turn, carry tool results in a dedicated field, and support
//! tools natively.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;
use uuid::Uuid;

use ocigen_core::messages::Message;
use ocigen_core::tools::ToolDefinition;

use crate::error::OciChatError;
use crate::provider::Provider;
use crate::response::{ChatResponseData, RawToolCall};
use crate::tools::{self, ParameterDefinition};

/// Adapter for the `cohere.*` model family.
#[derive(Debug, Clone, Copy, Default)]
pub struct CohereProvider;

impl CohereProvider {
    /// The current turn: everything from the most recent human message to
    /// the end, or the whole conversation when none exists.
    fn current_turn(messages: &[Message]) -> &[Message] {
        match messages
            .iter()
            .rposition(|m| matches!(m, Message::Human { .. }))
        {
            Some(idx) => &messages[idx..],
            None => messages,
        }
    }

    /// Collects tool results for the current turn by correlating each tool
    /// message with the most recent assistant message that requested tools.
    /// Results without a matching call id are dropped.
    fn tool_results(current_turn: &[Message]) -> Vec<Value> {
        let last_caller = current_turn
            .iter()
            .rev()
            .find(|m| !m.tool_calls().is_empty());
        let mut results = Vec::new();
        for message in current_turn {
            if let Message::Tool {
                content,
                tool_call_id,
            } = message
            {
                let calls = last_caller.map(Message::tool_calls).unwrap_or(&[]);
                let mut matched = false;
                for call in calls {
                    if call.id == *tool_call_id {
                        results.push(json!({
                            "call": {"name": call.name, "parameters": call.args},
                            "outputs": [{"output": content}],
                        }));
                        matched = true;
                    }
                }
                if !matched {
                    warn!(
                        "No tool call with id {} in the current turn, dropping its result",
                        tool_call_id
                    );
                }
            }
        }
        results
    }

    fn chatbot_history_entry(message: &Message) -> Value {
        // The service rejects empty chatbot turns; a single space stands in.
        let content = if message.content().is_empty() {
            " "
        } else {
            message.content()
        };
        let mut entry = Map::new();
        entry.insert("role".to_string(), json!("CHATBOT"));
        entry.insert("message".to_string(), json!(content));
        let tool_calls = message.tool_calls();
        if !tool_calls.is_empty() {
            let calls: Vec<Value> = tool_calls
                .iter()
                .map(|call| json!({"name": call.name, "parameters": call.args}))
                .collect();
            entry.insert("tool_calls".to_string(), Value::Array(calls));
        }
        Value::Object(entry)
    }

    /// Reshapes service tool calls into the OpenAI-style function map the
    /// host expects, assigning a fresh id to each.
    fn format_response_tool_calls(calls: &[RawToolCall]) -> Result<Vec<Value>, OciChatError> {
        let mut formatted = Vec::with_capacity(calls.len());
        for call in calls {
            formatted.push(json!({
                "id": Uuid::new_v4().simple().to_string(),
                "function": {
                    "name": call.name,
                    "arguments": serde_json::to_string(&call.parameters)?,
                },
                "type": "function",
            }));
        }
        Ok(formatted)
    }
}

impl Provider for CohereProvider {
    fn name(&self) -> &'static str {
        "cohere"
    }

    fn api_format(&self) -> &'static str {
        "COHERE"
    }

    fn stop_sequence_key(&self) -> &'static str {
        "stop_sequences"
    }

    fn role(&self, message: &Message) -> Result<&'static str, OciChatError> {
        match message {
            Message::Human { .. } => Ok("USER"),
            Message::Ai(_) => Ok("CHATBOT"),
            Message::System { .. } => Ok("SYSTEM"),
            Message::Tool { .. } => Ok("TOOL"),
            Message::Custom { role, .. } => Err(OciChatError::UnknownMessageRole(
                role.clone(),
                "cohere",
            )),
        }
    }

    fn messages_to_params(
        &self,
        messages: &[Message],
        kwargs: &Map<String, Value>,
    ) -> Result<Map<String, Value>, OciChatError> {
        let force_single_step = kwargs
            .get("is_force_single_step")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let history_end = messages.len().saturating_sub(1);
        let mut chat_history: Vec<Value> = Vec::new();
        for message in &messages[..history_end] {
            let role = self.role(message)?;
            match role {
                "USER" | "SYSTEM" => chat_history.push(json!({
                    "role": role,
                    "message": message.content(),
                })),
                "CHATBOT" => {
                    // In single-step mode the service replays tool use
                    // itself, so assistant turns that called tools stay out
                    // of the history.
                    if force_single_step && !message.tool_calls().is_empty() {
                        continue;
                    }
                    chat_history.push(Self::chatbot_history_entry(message));
                }
                // Tool outputs travel in tool_results, not in the history.
                _ => {}
            }
        }

        let current_turn = Self::current_turn(messages);
        let tool_results = Self::tool_results(current_turn);
        let message_str = if tool_results.is_empty() {
            messages
                .last()
                .map(|m| m.content().to_string())
                .unwrap_or_default()
        } else {
            String::new()
        };

        let mut params = Map::new();
        params.insert("message".to_string(), json!(message_str));
        params.insert("chat_history".to_string(), Value::Array(chat_history));
        if !tool_results.is_empty() {
            params.insert("tool_results".to_string(), Value::Array(tool_results));
        }
        params.insert("api_format".to_string(), json!(self.api_format()));
        Ok(params)
    }

    fn convert_tool(&self, tool: &ToolDefinition) -> Result<Value, OciChatError> {
        let descriptor = tools::normalize(tool)?;
        let tool = CohereTool {
            name: descriptor.name,
            description: descriptor.description,
            parameter_definitions: descriptor.parameters,
        };
        Ok(serde_json::to_value(tool)?)
    }

    fn response_text(&self, response: &ChatResponseData) -> String {
        response.chat_response.text.clone().unwrap_or_default()
    }

    fn generation_info(
        &self,
        response: &ChatResponseData,
    ) -> Result<Map<String, Value>, OciChatError> {
        let payload = &response.chat_response;
        let mut info = Map::new();
        info.insert(
            "documents".to_string(),
            payload.documents.clone().unwrap_or(Value::Null),
        );
        info.insert(
            "citations".to_string(),
            payload.citations.clone().unwrap_or(Value::Null),
        );
        info.insert(
            "search_queries".to_string(),
            payload.search_queries.clone().unwrap_or(Value::Null),
        );
        info.insert(
            "is_search_required".to_string(),
            payload.is_search_required.map_or(Value::Null, Value::Bool),
        );
        info.insert(
            "finish_reason".to_string(),
            payload.finish_reason.clone().map_or(Value::Null, Value::String),
        );
        if let Some(calls) = payload.tool_calls.as_deref() {
            if !calls.is_empty() {
                info.insert(
                    "tool_calls".to_string(),
                    Value::Array(Self::format_response_tool_calls(calls)?),
                );
            }
        }
        Ok(info)
    }

    fn stream_delta(&self, event: &Value) -> String {
        match event.get("text") {
            Some(text) if event.get("finishReason").is_none() => {
                text.as_str().unwrap_or_default().to_string()
            }
            _ => String::new(),
        }
    }
}

/// Cohere tool wire format
#[derive(Debug, Serialize, Deserialize)]
struct CohereTool {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    parameter_definitions: BTreeMap<String, ParameterDefinition>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ChatResponsePayload;
    use ocigen_core::messages::ToolCall;

    fn tool_call(id: &str, name: &str) -> ToolCall {
        let mut args = Map::new();
        args.insert("city".to_string(), json!("Zurich"));
        ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            args,
        }
    }

    fn params_for(messages: &[Message]) -> Map<String, Value> {
        CohereProvider
            .messages_to_params(messages, &Map::new())
            .expect("conversation is valid")
    }

    #[test]
    fn test_role_mapping() {
        let provider = CohereProvider;
        assert_eq!(provider.role(&Message::human("hi")), Ok("USER"));
        assert_eq!(provider.role(&Message::ai("yo")), Ok("CHATBOT"));
        assert_eq!(provider.role(&Message::system("be nice")), Ok("SYSTEM"));
        assert_eq!(provider.role(&Message::tool("42", "id")), Ok("TOOL"));

        let err = provider
            .role(&Message::custom("moderator", "ok"))
            .expect_err("custom roles have no cohere mapping");
        assert_eq!(
            err,
            OciChatError::UnknownMessageRole("moderator".to_string(), "cohere")
        );
    }

    #[test]
    fn test_history_carries_prior_turns_and_message_is_last_human_text() {
        let messages = vec![
            Message::system("You answer tersely."),
            Message::human("What is the capital of Austria?"),
            Message::ai("Vienna."),
            Message::human("And of Switzerland?"),
        ];
        let params = params_for(&messages);
        assert_eq!(params.get("message"), Some(&json!("And of Switzerland?")));
        assert_eq!(params.get("api_format"), Some(&json!("COHERE")));
        let history = params["chat_history"].as_array().expect("history array");
        assert_eq!(history.len(), 3);
        assert_eq!(history[0]["role"], json!("SYSTEM"));
        assert_eq!(history[1]["role"], json!("USER"));
        assert_eq!(history[2]["role"], json!("CHATBOT"));
        assert_eq!(history[2]["message"], json!("Vienna."));
        assert!(history[2].get("tool_calls").is_none());
    }

    #[test]
    fn test_empty_assistant_turn_becomes_single_space() {
        let messages = vec![
            Message::human("weather in Zurich?"),
            Message::ai_with_tool_calls("", vec![tool_call("a1", "get_weather")]),
            Message::human("thanks, and tomorrow?"),
        ];
        let params = params_for(&messages);
        let history = params["chat_history"].as_array().expect("history array");
        let chatbot = &history[1];
        assert_eq!(chatbot["message"], json!(" "));
        let calls = chatbot["tool_calls"].as_array().expect("calls survive");
        assert_eq!(calls[0]["name"], json!("get_weather"));
        assert_eq!(calls[0]["parameters"]["city"], json!("Zurich"));
        assert!(calls[0].get("id").is_none(), "history calls carry no id");
    }

    #[test]
    fn test_force_single_step_drops_assistant_turns_with_tool_calls() {
        let messages = vec![
            Message::human("weather?"),
            Message::ai_with_tool_calls("", vec![tool_call("a1", "get_weather")]),
            Message::ai("It is sunny."),
            Message::human("and tomorrow?"),
        ];
        let mut kwargs = Map::new();
        kwargs.insert("is_force_single_step".to_string(), json!(true));
        let params = CohereProvider
            .messages_to_params(&messages, &kwargs)
            .expect("conversation is valid");
        let history = params["chat_history"].as_array().expect("history array");
        assert_eq!(history.len(), 2, "tool-calling turn is skipped");
        assert_eq!(history[0]["role"], json!("USER"));
        assert_eq!(history[1]["message"], json!("It is sunny."));
    }

    #[test]
    fn test_tool_results_correlate_against_the_latest_caller() {
        let messages = vec![
            Message::human("weather in two cities?"),
            Message::ai_with_tool_calls(
                "",
                vec![tool_call("a1", "get_weather"), tool_call("a2", "get_weather")],
            ),
            Message::tool("sunny", "a1"),
            Message::tool("windy", "a2"),
        ];
        let params = params_for(&messages);
        assert_eq!(params.get("message"), Some(&json!("")));
        let results = params["tool_results"].as_array().expect("results array");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["call"]["name"], json!("get_weather"));
        assert_eq!(results[0]["outputs"][0]["output"], json!("sunny"));
        assert_eq!(results[1]["outputs"][0]["output"], json!("windy"));
    }

    #[test]
    fn test_unmatched_tool_result_is_dropped() {
        let messages = vec![
            Message::human("weather?"),
            Message::ai_with_tool_calls("", vec![tool_call("a1", "get_weather")]),
            Message::tool("orphaned output", "zz9"),
        ];
        let params = params_for(&messages);
        assert!(params.get("tool_results").is_none());
        // With no results to answer, the last message text is sent as-is.
        assert_eq!(params.get("message"), Some(&json!("orphaned output")));
    }

    #[test]
    fn test_tool_messages_stay_out_of_the_history() {
        let messages = vec![
            Message::human("weather?"),
            Message::ai_with_tool_calls("", vec![tool_call("a1", "get_weather")]),
            Message::tool("sunny", "a1"),
            Message::human("nice, thanks"),
        ];
        let params = params_for(&messages);
        let history = params["chat_history"].as_array().expect("history array");
        let roles: Vec<&Value> = history.iter().map(|entry| &entry["role"]).collect();
        assert_eq!(roles, vec![&json!("USER"), &json!("CHATBOT")]);
    }

    #[test]
    fn test_stream_delta_skips_the_final_event() {
        let provider = CohereProvider;
        assert_eq!(provider.stream_delta(&json!({"text": "Hel"})), "Hel");
        assert_eq!(
            provider.stream_delta(&json!({"text": "Hello", "finishReason": "COMPLETE"})),
            ""
        );
        assert_eq!(provider.stream_delta(&json!({"apiFormat": "COHERE"})), "");
    }

    #[test]
    fn test_generation_info_keeps_absent_fields_as_null() {
        let response = ChatResponseData {
            chat_response: ChatResponsePayload {
                text: Some("Vienna.".to_string()),
                finish_reason: Some("COMPLETE".to_string()),
                ..ChatResponsePayload::default()
            },
            ..ChatResponseData::default()
        };
        let info = CohereProvider
            .generation_info(&response)
            .expect("info extraction succeeds");
        assert_eq!(info.get("finish_reason"), Some(&json!("COMPLETE")));
        assert_eq!(info.get("documents"), Some(&Value::Null));
        assert_eq!(info.get("citations"), Some(&Value::Null));
        assert_eq!(info.get("search_queries"), Some(&Value::Null));
        assert_eq!(info.get("is_search_required"), Some(&Value::Null));
        assert!(info.get("tool_calls").is_none());
    }

    #[test]
    fn test_generation_info_formats_tool_calls_with_fresh_ids() {
        let mut parameters = Map::new();
        parameters.insert("city".to_string(), json!("Zurich"));
        let response = ChatResponseData {
            chat_response: ChatResponsePayload {
                tool_calls: Some(vec![RawToolCall {
                    name: "get_weather".to_string(),
                    parameters,
                }]),
                ..ChatResponsePayload::default()
            },
            ..ChatResponseData::default()
        };
        let info = CohereProvider
            .generation_info(&response)
            .expect("info extraction succeeds");
        let calls = info["tool_calls"].as_array().expect("formatted calls");
        assert_eq!(calls[0]["type"], json!("function"));
        assert_eq!(calls[0]["function"]["name"], json!("get_weather"));
        let arguments = calls[0]["function"]["arguments"]
            .as_str()
            .expect("arguments are a JSON string");
        assert_eq!(
            serde_json::from_str::<Value>(arguments).expect("valid JSON"),
            json!({"city": "Zurich"})
        );
        let id = calls[0]["id"].as_str().expect("fresh id");
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_response_text_reads_the_text_field() {
        let response = ChatResponseData {
            chat_response: ChatResponsePayload {
                text: Some("Vienna.".to_string()),
                ..ChatResponsePayload::default()
            },
            ..ChatResponseData::default()
        };
        assert_eq!(CohereProvider.response_text(&response), "Vienna.");
        assert_eq!(CohereProvider.response_text(&ChatResponseData::default()), "");
    }

    #[test]
    fn test_convert_tool_emits_parameter_definitions() {
        let schema = json!({
            "title": "get_weather",
            "description": "Fetch the current weather.",
            "properties": {
                "city": {"type": "string", "description": "City to look up"}
            }
        });
        let wire = CohereProvider
            .convert_tool(&ToolDefinition::Schema(schema))
            .expect("valid tool");
        assert_eq!(wire["name"], json!("get_weather"));
        assert_eq!(
            wire["parameter_definitions"]["city"]["type"],
            json!("String")
        );
        assert_eq!(
            wire["parameter_definitions"]["city"]["is_required"],
            json!(true)
        );
    }
}
