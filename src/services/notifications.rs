//! Redemption-code delivery: WhatsApp first, SMS fallback. Each attempt
//! is recorded as an outbound_messages row regardless of outcome.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::Config;
use crate::models::{Booking, MessageChannel, MessageStatus, RedemptionCode};
use crate::utils::error::AppError;

const CODE_TEMPLATE: &str = "stayflex_redemption_code";

#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub ok: bool,
    pub provider_message_id: String,
    pub error_message: String,
}

impl SendOutcome {
    fn sent(provider_message_id: String) -> Self {
        Self {
            ok: true,
            provider_message_id,
            error_message: String::new(),
        }
    }
}

#[async_trait]
pub trait WhatsAppProvider: Send + Sync {
    async fn send_template(&self, to_e164: &str, template_name: &str, variables: &Value)
        -> SendOutcome;
}

#[async_trait]
pub trait SmsProvider: Send + Sync {
    async fn send_text(&self, to_e164: &str, text: &str) -> SendOutcome;
}

/// Development provider: always succeeds without touching the network.
pub struct StubWhatsApp;

#[async_trait]
impl WhatsAppProvider for StubWhatsApp {
    async fn send_template(&self, _to: &str, _template: &str, _vars: &Value) -> SendOutcome {
        SendOutcome::sent(format!("stub-wa-{}", Utc::now().timestamp()))
    }
}

pub struct StubSms;

#[async_trait]
impl SmsProvider for StubSms {
    async fn send_text(&self, _to: &str, _text: &str) -> SendOutcome {
        SendOutcome::sent(format!("stub-sms-{}", Utc::now().timestamp()))
    }
}

pub struct Notifier {
    whatsapp: Arc<dyn WhatsAppProvider>,
    sms: Arc<dyn SmsProvider>,
    whatsapp_provider: String,
    sms_provider: String,
}

impl Notifier {
    pub fn from_config(config: &Config) -> Self {
        if config.whatsapp_provider != "stub" {
            tracing::warn!(
                provider = %config.whatsapp_provider,
                "Unknown WhatsApp provider, falling back to stub"
            );
        }
        if config.sms_provider != "stub" {
            tracing::warn!(
                provider = %config.sms_provider,
                "Unknown SMS provider, falling back to stub"
            );
        }

        Self {
            whatsapp: Arc::new(StubWhatsApp),
            sms: Arc::new(StubSms),
            whatsapp_provider: config.whatsapp_provider.clone(),
            sms_provider: config.sms_provider.clone(),
        }
    }

    /// Delivers the code, trying WhatsApp first and SMS on failure.
    /// Returns which channel carried it, or "none".
    pub async fn send_code_with_fallback(
        &self,
        pool: &PgPool,
        booking: &Booking,
        code: &RedemptionCode,
        to_e164: &str,
        property_name: &str,
    ) -> Result<&'static str, AppError> {
        let variables = json!({
            "code": code.code,
            "property": property_name,
            "check_in": booking.check_in.to_string(),
            "booking": booking.id,
        });

        let wa_msg_id = self
            .record_queued(
                pool,
                booking.id,
                to_e164,
                MessageChannel::Whatsapp,
                &self.whatsapp_provider,
                CODE_TEMPLATE,
                json!({ "variables": variables }),
            )
            .await?;

        let wa_result = self
            .whatsapp
            .send_template(to_e164, CODE_TEMPLATE, &variables)
            .await;
        self.record_outcome(pool, wa_msg_id, &wa_result).await?;
        if wa_result.ok {
            return Ok("whatsapp");
        }

        let sms_text = format!(
            "StayFlex code: {}. Property: {}. Check-in: {}.",
            code.code, property_name, booking.check_in
        );
        let sms_msg_id = self
            .record_queued(
                pool,
                booking.id,
                to_e164,
                MessageChannel::Sms,
                &self.sms_provider,
                "",
                json!({ "text": sms_text }),
            )
            .await?;

        let sms_result = self.sms.send_text(to_e164, &sms_text).await;
        self.record_outcome(pool, sms_msg_id, &sms_result).await?;
        if sms_result.ok {
            return Ok("sms");
        }

        Ok("none")
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_queued(
        &self,
        pool: &PgPool,
        booking_id: Uuid,
        to_e164: &str,
        channel: MessageChannel,
        provider: &str,
        template_name: &str,
        payload: Value,
    ) -> Result<Uuid, AppError> {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO outbound_messages
                (booking_id, to_phone_e164, channel, provider, template_name, status, payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(booking_id)
        .bind(to_e164)
        .bind(channel)
        .bind(provider)
        .bind(template_name)
        .bind(MessageStatus::Queued)
        .bind(payload)
        .fetch_one(pool)
        .await?;

        Ok(id)
    }

    async fn record_outcome(
        &self,
        pool: &PgPool,
        message_id: Uuid,
        outcome: &SendOutcome,
    ) -> Result<(), AppError> {
        let status = if outcome.ok {
            MessageStatus::Sent
        } else {
            MessageStatus::Failed
        };

        sqlx::query(
            "UPDATE outbound_messages
             SET status = $1, provider_message_id = $2, error_message = $3, updated_at = now()
             WHERE id = $4",
        )
        .bind(status)
        .bind(&outcome.provider_message_id)
        .bind(&outcome.error_message)
        .bind(message_id)
        .execute(pool)
        .await?;

        Ok(())
    }
}
