//! Turn dispatcher: the seam between the model and anything with side effects.
//!
//! Every inbound message passes through [`Dispatcher::handle_message`], which
//! serializes turns per user and routes each one down exactly one path:
//!
//! 1. Confirmation with a pending draft: commit through the order backend.
//! 2. Bare confirmation with no draft: deterministic "nothing to confirm".
//! 3. Everything else: generate a decision and act on it. Order suggestions
//!    from the model only ever produce a draft; the commit in step 1 is the
//!    sole call site that creates an order.
//!
//! The dispatcher never returns an error. Generation failures, tool failures,
//! and backend outages all degrade to an apologetic reply so the conversation
//! survives whatever broke underneath it.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::timeout;

use forno_gateway::{GenerationRequest, Provider};
use forno_session::{extract, Intent, OrderDraft, OrderItem, Role, SessionMemory, Turn};
use forno_tools::{OrderBackend, OrderError, Tool};

use crate::decision::{parse_decision, parse_items, AgentDecision};
use crate::prompt::build_system_prompt;

const NOTHING_TO_CONFIRM_REPLY: &str =
    "There's nothing to confirm right now. Would you like to see our menu? 🍕";

const EMPTY_DRAFT_REPLY: &str = "I'm sorry, I don't have any items in your pending order. \
     Could you please tell me what pizza you'd like to order?";

const GENERATION_FAILED_REPLY: &str = "I apologize, but I encountered an error processing \
     your request. Please try again or rephrase your message.";

const UNKNOWN_TOOL_REPLY: &str =
    "I'm not quite sure how to help with that. Could you rephrase your request?";

const ORDER_RETRY_REPLY: &str = "❌ Sorry, there was an issue placing your order. \
     Your items are saved, so please try confirming again in a moment.";

// ============================================================================
// Configuration and outcome types
// ============================================================================

/// Tunables for a [`Dispatcher`].
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Token cap passed through to the provider.
    pub max_tokens: u32,
    /// Sampling temperature passed through to the provider.
    pub temperature: f64,
    /// Upper bound on any single provider or order-backend call.
    pub collaborator_timeout: Duration,
    /// Include verbatim recent turns in the prompt alongside the summary.
    pub include_raw_turns: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.7,
            collaborator_timeout: Duration::from_secs(60),
            include_raw_turns: true,
        }
    }
}

/// Whether a turn completed normally or degraded to an error reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    Success,
    Error,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// The dispatcher's answer for one inbound message.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    /// User-facing reply text.
    pub reply: String,
    /// Name of the tool that produced the reply, if any.
    pub tool_used: Option<String>,
    /// The model's reasoning for a tool call, when it offered one.
    pub thought: Option<String>,
    pub status: OutcomeStatus,
}

impl ChatOutcome {
    fn answered(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            tool_used: None,
            thought: None,
            status: OutcomeStatus::Success,
        }
    }

    fn degraded(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            tool_used: None,
            thought: None,
            status: OutcomeStatus::Error,
        }
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Routes inbound messages between the model, the read-only tools, and the
/// order backend. Cheap to share behind an [`Arc`].
pub struct Dispatcher {
    provider: Arc<dyn Provider>,
    tools: Vec<Arc<dyn Tool>>,
    order_backend: Arc<dyn OrderBackend>,
    memory: Arc<SessionMemory>,
    system_prompt: String,
    config: DispatcherConfig,
    /// Per-user turn locks. A user's second message waits for their first
    /// to finish, so the draft a confirmation commits is never mid-write.
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl Dispatcher {
    pub fn new(
        provider: Arc<dyn Provider>,
        tools: Vec<Arc<dyn Tool>>,
        order_backend: Arc<dyn OrderBackend>,
        memory: Arc<SessionMemory>,
        config: DispatcherConfig,
    ) -> Self {
        let system_prompt = build_system_prompt(&tools);
        Self {
            provider,
            tools,
            order_backend,
            memory,
            system_prompt,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The session memory this dispatcher reads and writes.
    pub fn memory(&self) -> &Arc<SessionMemory> {
        &self.memory
    }

    /// Handle one user message end to end.
    ///
    /// Infallible by contract: anything that goes wrong becomes a reply with
    /// [`OutcomeStatus::Error`]. Both the user turn and the assistant reply
    /// are recorded in session memory before this returns.
    pub async fn handle_message(&self, user_id: &str, text: &str) -> ChatOutcome {
        let lock = self.user_lock(user_id).await;
        let _turn = lock.lock().await;

        self.memory.add_turn(user_id, Role::User, text).await;

        let outcome = if self.memory.is_confirmation(text) {
            match self.memory.get_pending_order(user_id).await {
                Some(draft) => self.commit_order(user_id, draft).await,
                None if self.is_bare_confirmation(text) => {
                    tracing::debug!(user_id, "Confirmation with no pending order");
                    ChatOutcome::answered(NOTHING_TO_CONFIRM_REPLY)
                }
                None => self.run_agent(user_id, text).await,
            }
        } else {
            self.run_agent(user_id, text).await
        };

        match &outcome.tool_used {
            Some(tool) => {
                self.memory
                    .add_turn_with_metadata(
                        user_id,
                        Role::Assistant,
                        &outcome.reply,
                        serde_json::json!({ "tool": tool }),
                    )
                    .await;
            }
            None => {
                self.memory
                    .add_turn(user_id, Role::Assistant, &outcome.reply)
                    .await;
            }
        }

        outcome
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        Arc::clone(locks.entry(user_id.to_string()).or_default())
    }

    /// True when the message is a confirmation and nothing else: no item
    /// mentions, no quantities, no other intent. "yes" is bare; "yes, and
    /// show me the menu" is not.
    fn is_bare_confirmation(&self, text: &str) -> bool {
        let turns = [Turn::new(Role::User, text)];
        let extraction = extract(&turns, self.memory.vocabulary());
        extraction.intents == [Intent::Confirmation] && extraction.entities.is_empty()
    }

    /// Commit the pending draft through the order backend.
    ///
    /// The draft is cleared only on success or when it turns out to be empty.
    /// On failure or timeout it stays put, so the user can simply confirm
    /// again once the backend recovers.
    async fn commit_order(&self, user_id: &str, draft: OrderDraft) -> ChatOutcome {
        if draft.items.is_empty() {
            tracing::warn!(user_id, "Pending order has no items; clearing it");
            self.memory.clear_pending_order(user_id).await;
            return ChatOutcome::degraded(EMPTY_DRAFT_REPLY);
        }

        tracing::info!(user_id, items = draft.items.len(), "Committing confirmed order");

        let result = timeout(
            self.config.collaborator_timeout,
            self.order_backend.create_order(&draft),
        )
        .await;

        match result {
            Ok(Ok(receipt)) => {
                self.memory.clear_pending_order(user_id).await;
                let reply = format!(
                    "🎉 Order confirmed!\n\n📋 Order ID: {}\n💰 Total: ${:.2}\n\n✅ Your pizza will be delivered in 25-35 minutes!",
                    receipt.order_id, receipt.total
                );
                ChatOutcome {
                    reply,
                    tool_used: Some("create_order".to_string()),
                    thought: None,
                    status: OutcomeStatus::Success,
                }
            }
            Ok(Err(OrderError::EmptyDraft)) => {
                self.memory.clear_pending_order(user_id).await;
                ChatOutcome::degraded(EMPTY_DRAFT_REPLY)
            }
            Ok(Err(e)) => {
                tracing::error!(user_id, error = %e, "Order creation failed; draft kept");
                ChatOutcome::degraded(ORDER_RETRY_REPLY)
            }
            Err(_) => {
                tracing::error!(user_id, "Order creation timed out; draft kept");
                ChatOutcome::degraded(ORDER_RETRY_REPLY)
            }
        }
    }

    /// Ordinary dialogue: build the prompt, generate a decision, act on it.
    async fn run_agent(&self, user_id: &str, text: &str) -> ChatOutcome {
        let context = self
            .memory
            .prompt_context(user_id, self.config.include_raw_turns)
            .await;

        let mut prompt = String::new();
        let _ = writeln!(prompt, "{context}");
        let _ = write!(prompt, "\nUser Message: {text}\n\nYour JSON Response:");

        let request = GenerationRequest {
            system: Some(self.system_prompt.clone()),
            prompt,
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
        };

        let generation = timeout(
            self.config.collaborator_timeout,
            self.provider.generate(request),
        )
        .await;

        let raw = match generation {
            Ok(Ok(generation)) => generation.text,
            Ok(Err(e)) => {
                tracing::error!(user_id, error = %e, "Generation failed");
                return ChatOutcome::degraded(GENERATION_FAILED_REPLY);
            }
            Err(_) => {
                tracing::error!(user_id, "Generation timed out");
                return ChatOutcome::degraded(GENERATION_FAILED_REPLY);
            }
        };

        match parse_decision(&raw) {
            AgentDecision::Reply { text } => ChatOutcome::answered(text),
            AgentDecision::ProposeOrder { reply, items } => {
                self.store_proposal(user_id, items).await;
                ChatOutcome::answered(reply)
            }
            AgentDecision::ToolCall { thought, tool, args } if tool == "create_order" => {
                // The model never commits directly. A create_order call is
                // demoted to a draft that waits for the user's confirmation.
                let items = parse_items(args.get("items").unwrap_or(&Value::Null));
                if items.is_empty() {
                    tracing::warn!(user_id, "Order attempt without parsable items");
                    return ChatOutcome::answered(
                        "I'd love to help you order! What pizza would you like?",
                    );
                }
                let reply = proposal_reply(&items);
                self.store_proposal(user_id, items).await;
                ChatOutcome {
                    reply,
                    tool_used: None,
                    thought: non_empty(thought),
                    status: OutcomeStatus::Success,
                }
            }
            AgentDecision::ToolCall { thought, tool, args } => {
                self.run_tool(user_id, thought, tool, args).await
            }
        }
    }

    async fn store_proposal(&self, user_id: &str, items: Vec<OrderItem>) {
        tracing::info!(user_id, items = items.len(), "Storing order draft pending confirmation");
        let draft = OrderDraft::new(user_id, items);
        self.memory.set_pending_order(user_id, draft).await;
    }

    async fn run_tool(
        &self,
        user_id: &str,
        thought: String,
        tool_name: String,
        mut args: Value,
    ) -> ChatOutcome {
        let Some(tool) = self.tools.iter().find(|t| t.name() == tool_name) else {
            tracing::warn!(user_id, tool = %tool_name, "Model requested an unknown tool");
            return ChatOutcome::degraded(UNKNOWN_TOOL_REPLY);
        };

        // Tools that personalize output need to know who is asking.
        if let Some(obj) = args.as_object_mut() {
            obj.entry("user_id")
                .or_insert_with(|| Value::String(user_id.to_string()));
        } else {
            args = serde_json::json!({ "user_id": user_id });
        }

        tracing::info!(user_id, tool = %tool_name, "Executing tool");

        match tool.execute(args).await {
            Ok(result) if result.success => ChatOutcome {
                reply: result.output,
                tool_used: Some(tool_name),
                thought: non_empty(thought),
                status: OutcomeStatus::Success,
            },
            Ok(result) => {
                let error = result
                    .error
                    .unwrap_or_else(|| "Unknown error".to_string());
                tracing::warn!(user_id, tool = %tool_name, error = %error, "Tool reported failure");
                ChatOutcome::degraded(format!(
                    "I encountered an error: {error}. Please try again or rephrase your request."
                ))
            }
            Err(e) => {
                tracing::error!(user_id, tool = %tool_name, error = %e, "Tool execution failed");
                ChatOutcome::degraded(format!(
                    "I encountered an error: {e}. Please try again or rephrase your request."
                ))
            }
        }
    }
}

/// Confirmation request shown when the model tried to order directly and we
/// turned its call into a draft.
fn proposal_reply(items: &[OrderItem]) -> String {
    let total: f64 = items
        .iter()
        .map(|i| i.unit_price * f64::from(i.qty))
        .sum();
    let summary = items
        .iter()
        .map(|i| format!("{}x {} ({})", i.qty, i.name, i.variant))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Got it! {summary} for ${:.2}. Should I confirm your order? (yes/haan) 🍕",
        (total * 100.0).round() / 100.0
    )
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use forno_gateway::{Generation, ProviderError};
    use forno_session::MemoryConfig;
    use forno_tools::{OrderReceipt, ToolResult};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    struct ScriptedProvider {
        responses: StdMutex<Vec<String>>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(responses: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                responses: StdMutex::new(responses.iter().map(|s| s.to_string()).collect()),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "test-model"
        }

        async fn generate(&self, _request: GenerationRequest) -> Result<Generation, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(ProviderError {
                    provider: "scripted".to_string(),
                    model: "test-model".to_string(),
                    message: "script exhausted".to_string(),
                    status_code: None,
                });
            }
            Ok(Generation {
                provider: "scripted".to_string(),
                model: "test-model".to_string(),
                text: responses.remove(0),
                latency_ms: 1,
            })
        }
    }

    struct MockOrderBackend {
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    impl MockOrderBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            })
        }
    }

    #[async_trait]
    impl OrderBackend for MockOrderBackend {
        async fn create_order(&self, draft: &OrderDraft) -> Result<OrderReceipt, OrderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(OrderError::Backend(anyhow::anyhow!("kitchen is closed")));
            }
            let total: f64 = draft
                .items
                .iter()
                .map(|i| i.unit_price * f64::from(i.qty))
                .sum();
            Ok(OrderReceipt {
                order_id: "ORD-20250101-4242".to_string(),
                total: (total * 100.0).round() / 100.0,
            })
        }
    }

    struct EchoTool {
        captured: StdMutex<Option<Value>>,
    }

    impl EchoTool {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                captured: StdMutex::new(None),
            })
        }
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "search_menu"
        }

        fn description(&self) -> &str {
            "Search the pizza menu"
        }

        fn parameters_schema(&self) -> Value {
            serde_json::json!({ "type": "object" })
        }

        async fn execute(&self, args: Value) -> anyhow::Result<ToolResult> {
            *self.captured.lock().unwrap() = Some(args);
            Ok(ToolResult::success("🍕 **Found 2 pizza(s):**"))
        }
    }

    struct FailingTool;

    #[async_trait]
    impl Tool for FailingTool {
        fn name(&self) -> &str {
            "search_kb"
        }

        fn description(&self) -> &str {
            "Search the knowledge base"
        }

        fn parameters_schema(&self) -> Value {
            serde_json::json!({ "type": "object" })
        }

        async fn execute(&self, _args: Value) -> anyhow::Result<ToolResult> {
            Ok(ToolResult::failure("knowledge base is locked"))
        }
    }

    fn dispatcher_with(
        provider: Arc<dyn Provider>,
        backend: Arc<dyn OrderBackend>,
        tools: Vec<Arc<dyn Tool>>,
    ) -> Dispatcher {
        let memory = Arc::new(SessionMemory::new(MemoryConfig::default(), None));
        Dispatcher::new(provider, tools, backend, memory, DispatcherConfig::default())
    }

    fn pepperoni(qty: u32) -> OrderItem {
        OrderItem {
            name: "Pepperoni".to_string(),
            qty,
            variant: "large".to_string(),
            unit_price: 13.99,
        }
    }

    const PROPOSAL: &str = r#"{"reply": "1x Pepperoni (large) for $13.99. Should I confirm your order? (yes/haan)", "proposed_order": {"items": [{"name": "Pepperoni", "qty": 1, "variant": "large", "price": 13.99}]}}"#;

    #[tokio::test]
    async fn propose_then_confirm_places_exactly_one_order() {
        let provider = ScriptedProvider::new(&[PROPOSAL]);
        let backend = MockOrderBackend::new();
        let dispatcher = dispatcher_with(provider.clone(), backend.clone(), vec![]);

        let outcome = dispatcher
            .handle_message("u1", "I want a large pepperoni pizza")
            .await;
        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert!(outcome.reply.contains("confirm"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);

        let draft = dispatcher.memory().get_pending_order("u1").await;
        assert_eq!(draft.map(|d| d.items.len()), Some(1));

        let outcome = dispatcher.handle_message("u1", "yes").await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert!(outcome.reply.contains("ORD-20250101-4242"));
        assert!(outcome.reply.contains("13.99"));
        assert_eq!(outcome.tool_used.as_deref(), Some("create_order"));
        assert!(dispatcher.memory().get_pending_order("u1").await.is_none());

        // The commit turn never touched the model.
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bare_confirmation_without_draft_is_answered_locally() {
        let provider = ScriptedProvider::new(&[]);
        let backend = MockOrderBackend::new();
        let dispatcher = dispatcher_with(provider.clone(), backend.clone(), vec![]);

        let outcome = dispatcher.handle_message("u1", "yes").await;

        assert!(outcome.reply.contains("nothing to confirm"));
        assert_eq!(outcome.status, OutcomeStatus::Success);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert!(dispatcher.memory().get_pending_order("u1").await.is_none());
        assert_eq!(dispatcher.memory().turn_count("u1").await, 2);
    }

    #[tokio::test]
    async fn confirmation_mixed_with_other_intent_reaches_the_model() {
        let provider = ScriptedProvider::new(&[r#"{"reply": "Here is our menu!"}"#]);
        let backend = MockOrderBackend::new();
        let dispatcher = dispatcher_with(provider.clone(), backend.clone(), vec![]);

        // Contains a confirmation keyword but asks for something else too,
        // and there is no draft, so it flows to the model.
        let outcome = dispatcher.handle_message("u1", "ok show me the menu").await;

        assert_eq!(outcome.reply, "Here is our menu!");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn confirmation_inside_longer_message_still_commits_a_draft() {
        let provider = ScriptedProvider::new(&[]);
        let backend = MockOrderBackend::new();
        let dispatcher = dispatcher_with(provider.clone(), backend.clone(), vec![]);

        dispatcher
            .memory()
            .set_pending_order("u1", OrderDraft::new("u1", vec![pepperoni(1)]))
            .await;

        let outcome = dispatcher.handle_message("u1", "ok thanks, go ahead").await;

        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert!(outcome.reply.contains("Order confirmed"));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_draft_is_cleared_without_calling_the_backend() {
        let provider = ScriptedProvider::new(&[]);
        let backend = MockOrderBackend::new();
        let dispatcher = dispatcher_with(provider, backend.clone(), vec![]);

        dispatcher
            .memory()
            .set_pending_order("u1", OrderDraft::new("u1", vec![]))
            .await;

        let outcome = dispatcher.handle_message("u1", "yes").await;

        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert!(outcome.reply.contains("don't have any items"));
        assert!(dispatcher.memory().get_pending_order("u1").await.is_none());
    }

    #[tokio::test]
    async fn failed_commit_keeps_the_draft_for_a_retry() {
        let provider = ScriptedProvider::new(&[]);
        let backend = MockOrderBackend::new();
        let dispatcher = dispatcher_with(provider, backend.clone(), vec![]);

        dispatcher
            .memory()
            .set_pending_order("u1", OrderDraft::new("u1", vec![pepperoni(2)]))
            .await;
        backend.fail.store(true, Ordering::SeqCst);

        let outcome = dispatcher.handle_message("u1", "yes").await;
        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert!(outcome.reply.contains("issue placing your order"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        let draft = dispatcher.memory().get_pending_order("u1").await;
        assert_eq!(
            draft.map(|d| d.items[0].name.clone()),
            Some("Pepperoni".to_string())
        );

        // Backend recovers; confirming again commits the same draft.
        backend.fail.store(false, Ordering::SeqCst);
        let outcome = dispatcher.handle_message("u1", "haan").await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
        assert!(outcome.reply.contains("ORD-20250101-4242"));
        assert!(dispatcher.memory().get_pending_order("u1").await.is_none());
    }

    #[tokio::test]
    async fn newer_proposal_replaces_the_pending_draft() {
        let second = r#"{"reply": "1x BBQ Chicken (large) for $15.49. Confirm? (yes/haan)", "proposed_order": {"items": [{"name": "BBQ Chicken", "qty": 1, "variant": "large", "price": 15.49}]}}"#;
        let provider = ScriptedProvider::new(&[PROPOSAL, second]);
        let backend = MockOrderBackend::new();
        let dispatcher = dispatcher_with(provider, backend.clone(), vec![]);

        dispatcher
            .handle_message("u1", "I want a large pepperoni pizza")
            .await;
        dispatcher
            .handle_message("u1", "actually make it a bbq chicken instead")
            .await;

        let draft = dispatcher.memory().get_pending_order("u1").await;
        assert_eq!(
            draft.map(|d| d.items[0].name.clone()),
            Some("BBQ Chicken".to_string())
        );
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn model_create_order_call_is_demoted_to_a_proposal() {
        let call = r#"{"thought": "They want bbq", "tool": "create_order", "tool_input": {"items": [{"name": "BBQ Chicken", "qty": 1, "variant": "large", "price": 15.49}]}}"#;
        let provider = ScriptedProvider::new(&[call]);
        let backend = MockOrderBackend::new();
        let dispatcher = dispatcher_with(provider, backend.clone(), vec![]);

        let outcome = dispatcher.handle_message("u1", "get me a bbq chicken pizza").await;

        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
        assert!(outcome.reply.contains("Should I confirm"));
        assert!(outcome.reply.contains("15.49"));

        let draft = dispatcher.memory().get_pending_order("u1").await;
        assert_eq!(
            draft.map(|d| d.items[0].name.clone()),
            Some("BBQ Chicken".to_string())
        );
    }

    #[tokio::test]
    async fn unknown_tool_degrades_to_an_apology() {
        let call = r#"{"thought": "hmm", "tool": "launch_rocket", "tool_input": {}}"#;
        let provider = ScriptedProvider::new(&[call]);
        let dispatcher = dispatcher_with(provider, MockOrderBackend::new(), vec![]);

        let outcome = dispatcher.handle_message("u1", "do something weird").await;

        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert!(outcome.reply.contains("rephrase"));
        assert!(outcome.tool_used.is_none());
    }

    #[tokio::test]
    async fn tool_output_becomes_the_reply_with_user_id_injected() {
        let call = r#"{"thought": "menu lookup", "tool": "search_menu", "tool_input": {"query": "spicy"}}"#;
        let provider = ScriptedProvider::new(&[call]);
        let echo = EchoTool::new();
        let dispatcher = dispatcher_with(
            provider,
            MockOrderBackend::new(),
            vec![echo.clone() as Arc<dyn Tool>],
        );

        let outcome = dispatcher.handle_message("u1", "show me spicy pizzas").await;

        assert!(outcome.reply.contains("Found 2"));
        assert_eq!(outcome.tool_used.as_deref(), Some("search_menu"));
        assert_eq!(outcome.thought.as_deref(), Some("menu lookup"));

        let captured = echo.captured.lock().unwrap().clone().unwrap();
        assert_eq!(captured["query"], "spicy");
        assert_eq!(captured["user_id"], "u1");
    }

    #[tokio::test]
    async fn tool_failure_is_surfaced_gently() {
        let call = r#"{"thought": "kb", "tool": "search_kb", "tool_input": {"query": "hours"}}"#;
        let provider = ScriptedProvider::new(&[call]);
        let dispatcher = dispatcher_with(
            provider,
            MockOrderBackend::new(),
            vec![Arc::new(FailingTool) as Arc<dyn Tool>],
        );

        let outcome = dispatcher.handle_message("u1", "when do you close").await;

        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert!(outcome.reply.contains("knowledge base is locked"));
        assert!(outcome.reply.contains("try again"));
    }

    #[tokio::test]
    async fn generation_failure_degrades_but_records_the_turns() {
        let provider = ScriptedProvider::new(&[]);
        let dispatcher = dispatcher_with(provider, MockOrderBackend::new(), vec![]);

        let outcome = dispatcher.handle_message("u1", "tell me a pizza fact").await;

        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert!(outcome.reply.contains("I apologize"));
        assert_eq!(dispatcher.memory().turn_count("u1").await, 2);
    }

    #[tokio::test]
    async fn non_json_model_output_is_used_verbatim() {
        let provider = ScriptedProvider::new(&["Hey! I can help you order pizza."]);
        let dispatcher = dispatcher_with(provider, MockOrderBackend::new(), vec![]);

        let outcome = dispatcher.handle_message("u1", "hello!").await;

        assert_eq!(outcome.reply, "Hey! I can help you order pizza.");
        assert_eq!(outcome.status, OutcomeStatus::Success);
    }
}
