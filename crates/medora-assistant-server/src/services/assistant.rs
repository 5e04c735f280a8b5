/// assistant.rs - one conversational turn for the patient and clinic assistants
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::database::models::ClinicStats;
use crate::models::chat::{
    ClearResponse, ClinicChatRequest, ClinicChatResponse, ConversationContext, HistoryResponse,
    PatientChatRequest, PatientChatResponse,
};
use crate::utils::error::{ApiError, AI_NOT_CONFIGURED};

use super::conversation::{
    AssistantVariant, ContextBuilder, MessageMetadata, ResponseReconciler, Role, SessionStore,
    StoreStats,
};

/// Text-generation collaborator: prompt in, raw text out
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Live operational numbers for the clinic assistant
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ClinicDataProvider: Send + Sync {
    async fn clinic_stats(&self, clinic_id: &str) -> Result<ClinicStats>;
}

pub struct AssistantService {
    patient_store: SessionStore,
    clinic_store: SessionStore,
    patient_context: ContextBuilder,
    clinic_context: ContextBuilder,
    llm_provider: Option<Arc<dyn LlmProvider>>,
    clinic_data: Option<Arc<dyn ClinicDataProvider>>,
}

impl AssistantService {
    pub fn new(
        patient_store: SessionStore,
        clinic_store: SessionStore,
        llm_provider: Option<Arc<dyn LlmProvider>>,
        clinic_data: Option<Arc<dyn ClinicDataProvider>>,
    ) -> Self {
        if llm_provider.is_none() {
            warn!("No LLM credential configured; assistant turns will be rejected");
        }
        if clinic_data.is_none() {
            warn!("No clinic data source configured; clinic assistant will see empty statistics");
        }

        Self {
            patient_store,
            clinic_store,
            patient_context: ContextBuilder::for_variant(AssistantVariant::Patient),
            clinic_context: ContextBuilder::for_variant(AssistantVariant::Clinic),
            llm_provider,
            clinic_data,
        }
    }

    pub fn store(&self, variant: AssistantVariant) -> &SessionStore {
        match variant {
            AssistantVariant::Patient => &self.patient_store,
            AssistantVariant::Clinic => &self.clinic_store,
        }
    }

    pub fn is_llm_configured(&self) -> bool {
        self.llm_provider.is_some()
    }

    fn llm(&self) -> Result<&Arc<dyn LlmProvider>, ApiError> {
        self.llm_provider
            .as_ref()
            .ok_or_else(|| ApiError::Configuration(AI_NOT_CONFIGURED.to_string()))
    }

    async fn generate(&self, llm: &Arc<dyn LlmProvider>, prompt: &str) -> Result<String, ApiError> {
        let started = Instant::now();
        let raw = llm
            .generate(prompt)
            .await
            .map_err(|e| ApiError::LlmError(e.to_string()))?;
        debug!(
            "LLM returned {} chars in {}ms",
            raw.len(),
            started.elapsed().as_millis()
        );
        Ok(raw)
    }

    pub async fn patient_turn(&self, request: PatientChatRequest) -> Result<PatientChatResponse, ApiError> {
        let llm = self.llm()?;
        let message = validate_message(&request.message)?;
        let session_id = request.session_id();

        info!("Patient turn: session={}, message_len={}", session_id, message.len());

        // The user turn stays recorded even if generation fails below
        let session = self
            .patient_store
            .append(&session_id, Role::User, message, MessageMetadata::default());
        let prompt = self.patient_context.build_patient_prompt(&session, message);

        let raw = self.generate(llm, &prompt).await?;
        let reconciled = ResponseReconciler::reconcile_patient(&raw);
        let reply = reconciled.value;

        info!(
            "Patient turn reconciled via {:?}: severity={}, emergency={}",
            reconciled.tier, reply.severity, reply.emergency_trigger
        );

        let session = self.patient_store.append(
            &session_id,
            Role::Assistant,
            reply.reply.clone(),
            MessageMetadata::with_severity(reply.severity),
        );
        self.patient_store.update(&session_id, |session| {
            self.patient_context
                .update_facts(&mut session.extracted_facts, message, Some(reply.severity))
        });

        Ok(PatientChatResponse::new(reply, session_id, session.message_count()))
    }

    pub async fn clinic_turn(
        &self,
        clinic_id: &str,
        request: ClinicChatRequest,
    ) -> Result<ClinicChatResponse, ApiError> {
        let llm = self.llm()?;
        let message = validate_message(&request.message)?;

        info!("Clinic turn: clinic={}, message_len={}", clinic_id, message.len());

        self.clinic_store
            .append(clinic_id, Role::User, message, MessageMetadata::default());

        let stats = self.load_clinic_stats(clinic_id).await?;
        let session = self.clinic_store.read(clinic_id);
        let prompt = self.clinic_context.build_clinic_prompt(&session, &stats, message);

        let raw = self.generate(llm, &prompt).await?;
        let reconciled = ResponseReconciler::reconcile_clinic(&raw);
        let reply = reconciled.value;

        info!(
            "Clinic turn reconciled via {:?}: {} insight(s), {} follow-up(s)",
            reconciled.tier,
            reply.clinic_insights.len(),
            reply.followup_questions.len()
        );

        let session = self.clinic_store.append(
            clinic_id,
            Role::Assistant,
            reply.reply.clone(),
            MessageMetadata {
                severity: None,
                followups: reply.followup_questions.clone(),
                insights: reply.clinic_insights.clone(),
            },
        );

        Ok(ClinicChatResponse {
            ai_response: reply,
            clinic_data: stats,
            conversation_context: ConversationContext {
                session_id: session.session_id.clone(),
                messages_in_memory: session.message_count(),
                max_messages: self.clinic_store.max_messages(),
            },
            timestamp: Utc::now(),
        })
    }

    async fn load_clinic_stats(&self, clinic_id: &str) -> Result<ClinicStats, ApiError> {
        match &self.clinic_data {
            Some(provider) => provider
                .clinic_stats(clinic_id)
                .await
                .map_err(|e| ApiError::DatabaseError(e.to_string())),
            None => Ok(ClinicStats::default()),
        }
    }

    /// Unknown ids yield an empty (freshly created) session, not an error
    pub fn history(&self, variant: AssistantVariant, session_id: &str) -> HistoryResponse {
        let session = self.store(variant).read(session_id);
        HistoryResponse {
            success: true,
            message_count: session.message_count(),
            session_id: session.session_id,
            messages: session.messages,
            extracted_facts: session.extracted_facts,
            last_activity: session.last_activity,
        }
    }

    pub fn clear(&self, variant: AssistantVariant, session_id: &str) -> ClearResponse {
        let existed = self.store(variant).delete(session_id);
        info!("Cleared {:?} session {} (existed: {})", variant, session_id, existed);
        ClearResponse::cleared(session_id)
    }

    pub fn stats(&self) -> Vec<StoreStats> {
        vec![self.patient_store.stats(), self.clinic_store.stats()]
    }

    /// Periodically drop sessions idle for longer than `ttl`
    pub fn spawn_idle_sweep(self: Arc<Self>, every: Duration, ttl: chrono::Duration) -> JoinHandle<()> {
        info!(
            "Idle session sweep every {:?}, ttl {}s",
            every,
            ttl.num_seconds()
        );
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = self.patient_store.purge_idle(ttl) + self.clinic_store.purge_idle(ttl);
                debug!("Idle sweep removed {} session(s)", removed);
            }
        })
    }
}

fn validate_message(message: &str) -> Result<&str, ApiError> {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return Err(ApiError::BadRequest("Message is required".to_string()));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::conversation::Severity;

    fn service(
        llm: Option<MockLlmProvider>,
        clinic_data: Option<MockClinicDataProvider>,
    ) -> AssistantService {
        AssistantService::new(
            SessionStore::for_variant(AssistantVariant::Patient),
            SessionStore::for_variant(AssistantVariant::Clinic),
            llm.map(|m| Arc::new(m) as Arc<dyn LlmProvider>),
            clinic_data.map(|m| Arc::new(m) as Arc<dyn ClinicDataProvider>),
        )
    }

    fn patient_request(message: &str, session_id: Option<&str>) -> PatientChatRequest {
        PatientChatRequest {
            message: message.to_string(),
            session_id: session_id.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_patient_turn_records_exchange_and_facts() {
        let mut llm = MockLlmProvider::new();
        llm.expect_generate()
            .withf(|prompt: &str| prompt.contains("USER: I have a fever for 2 days"))
            .times(1)
            .returning(|_| {
                Ok(r#"{"severity":"MODERATE","reply":"Rest and drink **fluids**.","emergency_trigger":false,"suggest_appointment":true,"appointment_reason":"Fever check"}"#.to_string())
            });
        let svc = service(Some(llm), None);

        let response = svc
            .patient_turn(patient_request("I have a fever for 2 days", Some("tab-1")))
            .await
            .unwrap();

        assert_eq!(response.severity, Severity::Moderate);
        assert_eq!(response.reply, "Rest and drink fluids.");
        assert!(response.suggest_appointment);
        assert_eq!(response.session_id, "tab-1");
        assert_eq!(response.conversation_length, 2);

        let history = svc.history(AssistantVariant::Patient, "tab-1");
        assert_eq!(history.messages[0].role, Role::User);
        assert_eq!(history.messages[1].metadata.severity, Some(Severity::Moderate));
        assert_eq!(history.extracted_facts.symptoms, vec!["fever"]);
        assert_eq!(history.extracted_facts.duration.as_deref(), Some("2 days"));
        assert_eq!(history.extracted_facts.last_severity, Some(Severity::Moderate));
    }

    #[tokio::test]
    async fn test_patient_turn_uses_default_session() {
        let mut llm = MockLlmProvider::new();
        llm.expect_generate()
            .returning(|_| Ok("Stay hydrated.".to_string()));
        let svc = service(Some(llm), None);

        let response = svc.patient_turn(patient_request("hello", None)).await.unwrap();

        assert_eq!(response.session_id, "default");
        assert_eq!(response.severity, Severity::Mild);
        assert_eq!(response.appointment_reason, "Medical consultation");
    }

    #[tokio::test]
    async fn test_session_is_trimmed_across_turns() {
        let mut llm = MockLlmProvider::new();
        llm.expect_generate().returning(|_| Ok("ok".to_string()));
        let svc = service(Some(llm), None);

        let mut last = None;
        for i in 0..5 {
            last = Some(
                svc.patient_turn(patient_request(&format!("turn {}", i), Some("s")))
                    .await
                    .unwrap(),
            );
        }

        assert_eq!(last.unwrap().conversation_length, 6);
        let history = svc.history(AssistantVariant::Patient, "s");
        assert_eq!(history.messages[0].content, "turn 2");
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_touching_store() {
        let svc = service(None, None);

        let err = svc
            .patient_turn(patient_request("hello", Some("s1")))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Configuration(_)));
        assert!(svc.store(AssistantVariant::Patient).is_empty());
    }

    #[tokio::test]
    async fn test_blank_message_is_rejected_before_touching_store() {
        let mut llm = MockLlmProvider::new();
        llm.expect_generate().times(0);
        let svc = service(Some(llm), None);

        let err = svc
            .patient_turn(patient_request("   ", Some("s1")))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(svc.store(AssistantVariant::Patient).is_empty());
    }

    #[tokio::test]
    async fn test_llm_failure_keeps_user_message() {
        let mut llm = MockLlmProvider::new();
        llm.expect_generate()
            .returning(|_| Err(anyhow::anyhow!("connection reset")));
        let svc = service(Some(llm), None);

        let err = svc
            .patient_turn(patient_request("my back hurts", Some("s1")))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::LlmError(_)));
        let history = svc.history(AssistantVariant::Patient, "s1");
        assert_eq!(history.message_count, 1);
        assert_eq!(history.messages[0].content, "my back hurts");
    }

    #[tokio::test]
    async fn test_clinic_turn_includes_stats_and_records_insights() {
        let mut data = MockClinicDataProvider::new();
        data.expect_clinic_stats()
            .withf(|clinic_id: &str| clinic_id == "clinic-42")
            .returning(|_| {
                Ok(ClinicStats {
                    todays_appointments: 7,
                    pending_appointments: 2,
                    ..ClinicStats::default()
                })
            });

        let mut llm = MockLlmProvider::new();
        llm.expect_generate()
            .withf(|prompt: &str| {
                prompt.contains("Appointments today: 7") && prompt.contains("CLINIC STAFF: How busy are we?")
            })
            .returning(|_| {
                Ok("```json\n{\"reply\":\"Seven visits today.\",\"clinic_insights\":[\"Two still pending\"],\"followup_questions\":[\"Confirm pending ones?\"]}\n```".to_string())
            });

        let svc = service(Some(llm), Some(data));
        let response = svc
            .clinic_turn("clinic-42", ClinicChatRequest { message: "How busy are we?".to_string() })
            .await
            .unwrap();

        assert_eq!(response.ai_response.reply, "Seven visits today.");
        assert_eq!(response.clinic_data.todays_appointments, 7);
        assert_eq!(response.conversation_context.messages_in_memory, 2);
        assert_eq!(response.conversation_context.max_messages, 8);

        let history = svc.history(AssistantVariant::Clinic, "clinic-42");
        assert_eq!(history.messages[1].metadata.insights, vec!["Two still pending"]);
        assert_eq!(history.messages[1].metadata.followups, vec!["Confirm pending ones?"]);
        assert!(history.extracted_facts.is_empty());
    }

    #[tokio::test]
    async fn test_clinic_turn_without_data_source_uses_empty_stats() {
        let mut llm = MockLlmProvider::new();
        llm.expect_generate().returning(|_| Ok("All quiet.".to_string()));
        let svc = service(Some(llm), None);

        let response = svc
            .clinic_turn("clinic-1", ClinicChatRequest { message: "status?".to_string() })
            .await
            .unwrap();

        assert_eq!(response.clinic_data, ClinicStats::default());
        assert_eq!(response.ai_response.reply, "All quiet.");
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let svc = service(None, None);
        svc.store(AssistantVariant::Patient).get_or_create("s1");

        assert!(svc.clear(AssistantVariant::Patient, "s1").success);
        assert!(svc.clear(AssistantVariant::Patient, "s1").success);
        assert_eq!(svc.history(AssistantVariant::Patient, "s1").message_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_sweep_purges_stale_sessions() {
        let svc = Arc::new(service(None, None));
        svc.store(AssistantVariant::Clinic).get_or_create("clinic-1");
        svc.store(AssistantVariant::Clinic)
            .update("clinic-1", |s| s.last_activity = Utc::now() - chrono::Duration::hours(8));

        let handle = svc.clone().spawn_idle_sweep(Duration::from_secs(60), chrono::Duration::hours(6));
        tokio::time::sleep(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;

        assert!(svc.store(AssistantVariant::Clinic).is_empty());
        handle.abort();
    }
}
