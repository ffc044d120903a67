//! Who sent a verified interaction.
//!
//! The signature gate attaches an [`InteractionIdentity`] to every request it
//! lets through, so handlers behind the gateway can tell the caller apart
//! from an unsigned request that merely shares the route.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
};
use parley_core::{Interaction, InteractionType, Snowflake};

/// Identity claims of an interaction whose signature checked out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionIdentity {
    pub interaction_id: Snowflake,
    pub application_id: Snowflake,
    pub kind: InteractionType,
    pub guild_id: Option<Snowflake>,
    /// Absent on pings.
    pub user_id: Option<Snowflake>,
    pub username: Option<String>,
}

impl InteractionIdentity {
    pub fn from_interaction(interaction: &Interaction) -> Self {
        let user = interaction.invoking_user();
        Self {
            interaction_id: interaction.id,
            application_id: interaction.application_id,
            kind: interaction.kind,
            guild_id: interaction.guild_id,
            user_id: user.map(|u| u.id),
            username: user.map(|u| u.username.clone()),
        }
    }
}

/// Extractor for the identity of a signed interaction.
///
/// Rejects with `401` when the request never passed the signature gate.
pub struct VerifiedInteraction(pub Arc<InteractionIdentity>);

#[async_trait]
impl<S> FromRequestParts<S> for VerifiedInteraction
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Arc<InteractionIdentity>>()
            .cloned()
            .map(VerifiedInteraction)
            .ok_or((StatusCode::UNAUTHORIZED, "Interaction is not verified"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn interaction(json: serde_json::Value) -> Interaction {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn guild_member_is_the_invoking_user() {
        let identity = InteractionIdentity::from_interaction(&interaction(serde_json::json!({
            "id": "10", "application_id": "20", "type": 3, "guild_id": "30",
            "member": {"user": {"id": "400", "username": "ferris"}},
            "data": {"custom_id": "retry", "component_type": 2}
        })));
        assert_eq!(identity.interaction_id, 10);
        assert_eq!(identity.application_id, 20);
        assert_eq!(identity.kind, InteractionType::MessageComponent);
        assert_eq!(identity.guild_id, Some(30));
        assert_eq!(identity.user_id, Some(400));
        assert_eq!(identity.username.as_deref(), Some("ferris"));
    }

    #[test]
    fn ping_has_no_user() {
        let identity = InteractionIdentity::from_interaction(&interaction(serde_json::json!({
            "id": "1", "application_id": "2", "type": 1
        })));
        assert_eq!(identity.user_id, None);
        assert_eq!(identity.username, None);
    }

    #[tokio::test]
    async fn missing_identity_is_rejected() {
        let (mut parts, _) = Request::new(()).into_parts();
        let rejection = VerifiedInteraction::from_request_parts(&mut parts, &()).await.err();
        assert_eq!(rejection, Some((StatusCode::UNAUTHORIZED, "Interaction is not verified")));

        let identity = Arc::new(InteractionIdentity::from_interaction(&interaction(serde_json::json!({
            "id": "1", "application_id": "2", "type": 2, "user": {"id": "7", "username": "dm"}
        }))));
        parts.extensions.insert(identity.clone());
        let VerifiedInteraction(found) = VerifiedInteraction::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert!(Arc::ptr_eq(&found, &identity));
    }
}
