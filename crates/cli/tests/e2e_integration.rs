//! End-to-end tests: the demo ordering functions driven through the full
//! turn engine, first against a scripted model and then over HTTP.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parlance_core::error::ProviderError;
use parlance_core::function::{FunctionDescriptor, FunctionRegistry, FunctionStore};
use parlance_core::message::{Message, Role, ToolCall, Usage};
use parlance_core::model::ChatModel;
use parlance_engine::{ChatEngine, HandlebarsTemplate, RequestBuilder};
use parlance_providers::{ChatClient, EndpointKind};
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Scripted model ─────────────────────────────────────────────────────

struct ScriptedModel {
    replies: Mutex<Vec<Message>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    fn new(replies: Vec<Message>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().rev().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        messages: &[Message],
        _functions: &[FunctionDescriptor],
    ) -> Result<Message, ProviderError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        Ok(self
            .replies
            .lock()
            .unwrap()
            .pop()
            .expect("no reply scripted"))
    }
}

fn calling(id: &str, name: &str, arguments: Value) -> Message {
    let mut message = Message::assistant("").with_tool_calls(vec![ToolCall {
        id: id.into(),
        name: name.into(),
        arguments: arguments.to_string(),
    }]);
    message.usage = Some(Usage {
        prompt_tokens: 50,
        completion_tokens: 10,
    });
    message
}

fn saying(text: &str) -> Message {
    let mut message = Message::assistant(text);
    message.usage = Some(Usage {
        prompt_tokens: 60,
        completion_tokens: 12,
    });
    message
}

async fn ordering_engine(model: Arc<dyn ChatModel>) -> ChatEngine {
    let functions =
        FunctionRegistry::initialize(parlance_functions::demo_functions(), FunctionStore::new())
            .await
            .unwrap();
    let template = HandlebarsTemplate::new(
        [("restaurant".to_string(), json!("Test Diner"))]
            .into_iter()
            .collect(),
    );
    let requests = RequestBuilder::new(
        "You take orders for {{restaurant}}.",
        Arc::new(template),
    );
    ChatEngine::new(model, functions, requests)
}

fn user(text: &str) -> Option<Value> {
    Some(Value::String(text.into()))
}

// ── Full ordering conversation ─────────────────────────────────────────

#[tokio::test]
async fn full_ordering_conversation() {
    let model = Arc::new(ScriptedModel::new(vec![
        calling("call_1", "get-menu", json!({})),
        calling(
            "call_2",
            "add-dishes",
            json!({"operation": "add", "dish": "Chicken Rice"}),
        ),
        saying("I've added chicken rice to your order."),
        calling("call_3", "complete-order", json!({})),
    ]));
    let engine = ordering_engine(model.clone()).await;

    // Turn 1: the menu is shown as-is, no interpretation.
    let turn = engine
        .generate(user("What can I eat?"), Vec::new())
        .await
        .unwrap();
    assert_eq!(turn.new_responses.len(), 2);
    assert_eq!(turn.new_responses[1].role, Role::Tool);
    assert!(turn.new_responses[1].content.starts_with("Here is our menu"));
    assert_eq!(turn.full_history.len(), 3);
    assert_eq!(model.requests().len(), 1);
    assert_eq!(
        model.requests()[0][0].content,
        "You take orders for Test Diner."
    );

    // Turn 2: the add result goes back to the model for a reply.
    let turn = engine
        .generate(user("Chicken rice please"), turn.full_history)
        .await
        .unwrap();
    assert_eq!(turn.reply(), Some("I've added chicken rice to your order."));
    assert_eq!(
        turn.new_responses[1].content,
        "Dish chicken rice was added to the order."
    );
    assert_eq!(turn.full_history.len(), 7);
    assert_eq!(model.requests().len(), 3);
    let interpreted = &model.requests()[2];
    assert_eq!(
        interpreted.last().unwrap().content,
        "Dish chicken rice was added to the order."
    );
    assert!(interpreted.iter().all(|m| m.usage.is_none()));

    // Turn 3: completion writes its own closing messages.
    let turn = engine
        .generate(user("That's all"), turn.full_history)
        .await
        .unwrap();
    let contents: Vec<&str> = turn
        .new_responses
        .iter()
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(contents.len(), 4);
    assert_eq!(contents[1], r#"{"dishes":["chicken rice"],"total":8.5}"#);
    assert_eq!(
        contents[2],
        "Thank you! Your order of chicken rice comes to $8.50. It will be ready shortly."
    );
    assert_eq!(contents[3], "Order closed; a new order has been started.");

    // The closing notice is shown but never stored.
    assert_eq!(turn.full_history.len(), 11);
    assert!(
        turn.full_history
            .iter()
            .all(|m| m.content != "Order closed; a new order has been started.")
    );
    assert_eq!(model.requests().len(), 4);
    assert_eq!(
        engine.functions().store().get(parlance_functions::ORDER_KEY),
        Some(json!([]))
    );

    let usage = Usage::accumulate(&turn.full_history);
    assert_eq!(usage.prompt_tokens, 50 + 50 + 60 + 50);
    engine.close().await.unwrap();
}

#[tokio::test]
async fn unknown_dish_is_reported_to_the_model() {
    let model = Arc::new(ScriptedModel::new(vec![
        calling(
            "call_1",
            "add-dishes",
            json!({"operation": "add", "dish": "pizza"}),
        ),
        saying("Sorry, we don't serve pizza."),
    ]));
    let engine = ordering_engine(model.clone()).await;

    let turn = engine.generate(user("One pizza"), Vec::new()).await.unwrap();
    assert_eq!(
        turn.new_responses[1].content,
        "Dish pizza was not found on the menu."
    );
    assert_eq!(turn.reply(), Some("Sorry, we don't serve pizza."));
    assert_eq!(
        engine.functions().store().get(parlance_functions::ORDER_KEY),
        Some(json!([]))
    );
}

#[tokio::test]
async fn snapshots_grow_one_message_at_a_time() {
    let model = Arc::new(ScriptedModel::new(vec![calling(
        "call_1",
        "get-menu",
        json!({}),
    )]));
    let engine = ordering_engine(model).await;

    let lengths: Vec<usize> = engine
        .generate_stream(user("Menu?"), Vec::new())
        .map(|snapshot| snapshot.unwrap().full_history.len())
        .collect()
        .await;
    assert_eq!(lengths, vec![1, 2, 3]);
}

// ── Over HTTP ──────────────────────────────────────────────────────────

#[tokio::test]
async fn ordering_turn_over_http() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-e2e"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "add-dishes",
                            "arguments": "{\"operation\":\"add\",\"dish\":\"milk tea\"}"
                        }
                    }]
                }
            }],
            "usage": { "prompt_tokens": 80, "completion_tokens": 20 }
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "One milk tea, coming up." } }],
            "usage": { "prompt_tokens": 95, "completion_tokens": 7 }
        })))
        .mount(&server)
        .await;

    let client = ChatClient::with_kind(
        format!("{}/v1/chat/completions", server.uri()),
        "sk-e2e",
        Some("gpt-4o-mini".into()),
        EndpointKind::FirstParty,
        Duration::from_secs(5),
    )
    .unwrap();
    let engine = ordering_engine(Arc::new(client)).await;

    let turn = engine
        .generate(user("A milk tea please"), Vec::new())
        .await
        .unwrap();
    assert_eq!(turn.reply(), Some("One milk tea, coming up."));
    assert_eq!(turn.full_history.len(), 4);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);

    let first: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(first["model"], "gpt-4o-mini");
    assert_eq!(first["tools"].as_array().unwrap().len(), 3);
    assert_eq!(first["messages"][0]["role"], "system");

    let second: Value = serde_json::from_slice(&requests[1].body).unwrap();
    let messages = second["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[2]["tool_calls"][0]["id"], "call_1");
    assert_eq!(messages[3]["role"], "tool");
    assert_eq!(messages[3]["tool_call_id"], "call_1");
    assert_eq!(messages[3]["content"], "Dish milk tea was added to the order.");
    assert!(messages.iter().all(|m| m.get("usage").is_none()));
}

#[tokio::test]
async fn http_failure_keeps_the_user_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let client = ChatClient::with_kind(
        format!("{}/chat", server.uri()),
        "gw",
        None,
        EndpointKind::Gateway,
        Duration::from_secs(5),
    )
    .unwrap();
    let engine = ordering_engine(Arc::new(client)).await;

    let err = engine.generate(user("Hello"), Vec::new()).await.unwrap_err();
    assert!(err.to_string().contains("500"));
    assert!(err.partial.new_responses.is_empty());
    assert_eq!(err.partial.full_history, vec![Message::user("Hello")]);
}
