//! Request extractors.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header, request::Parts},
};
use pollbox_common::Actor;
use pollbox_core::Provenance;

/// The current actor, identified or anonymous.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by actor middleware; absent when the middleware is not installed.
        Ok(Self(
            parts
                .extensions
                .get::<Actor>()
                .cloned()
                .unwrap_or(Actor::Anonymous),
        ))
    }
}

/// An identified actor. Rejects anonymous requests.
#[derive(Debug, Clone)]
pub struct AuthActor(pub Actor);

impl<S> FromRequestParts<S> for AuthActor
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .filter(|actor| actor.is_identified())
            .cloned()
            .map(AuthActor)
            .ok_or((StatusCode::UNAUTHORIZED, "Unauthorized"))
    }
}

/// Origin address and user agent of the request.
#[derive(Debug, Clone, Default)]
pub struct RequestProvenance(pub Provenance);

impl<S> FromRequestParts<S> for RequestProvenance
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // First hop is the client.
        let ip_address = header_value(parts, "x-forwarded-for")
            .and_then(|forwarded| forwarded.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
            .map(ToString::to_string);

        let user_agent = header_value(parts, header::USER_AGENT.as_str())
            .map(str::trim)
            .filter(|ua| !ua.is_empty())
            .map(ToString::to_string);

        Ok(Self(Provenance {
            ip_address,
            user_agent,
        }))
    }
}

fn header_value<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn test_provenance_takes_first_forwarded_hop() {
        let mut parts = parts(
            Request::builder()
                .header("x-forwarded-for", " 203.0.113.7 , 10.0.0.1")
                .header("user-agent", "curl/8.0"),
        );

        let RequestProvenance(provenance) =
            RequestProvenance::from_request_parts(&mut parts, &()).await.unwrap();

        assert_eq!(provenance.ip_address.as_deref(), Some("203.0.113.7"));
        assert_eq!(provenance.user_agent.as_deref(), Some("curl/8.0"));
    }

    #[tokio::test]
    async fn test_provenance_without_headers() {
        let mut parts = parts(Request::builder());

        let RequestProvenance(provenance) =
            RequestProvenance::from_request_parts(&mut parts, &()).await.unwrap();

        assert_eq!(provenance, Provenance::default());
    }

    #[tokio::test]
    async fn test_auth_actor_rejects_anonymous() {
        let mut parts = parts(Request::builder());
        parts.extensions.insert(Actor::Anonymous);

        let result = AuthActor::from_request_parts(&mut parts, &()).await;

        assert!(matches!(result, Err((StatusCode::UNAUTHORIZED, _))));
    }

    #[tokio::test]
    async fn test_current_actor_defaults_to_anonymous() {
        let mut parts = parts(Request::builder());

        let CurrentActor(actor) = CurrentActor::from_request_parts(&mut parts, &()).await.unwrap();

        assert_eq!(actor, Actor::Anonymous);
    }
}
