//! Authorization guards that enforce permission checks at the type level
//! so handlers cannot accidentally skip them.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::models::Participant;

/// The authenticated caller, resolved by the auth middleware.
#[derive(Debug, Clone)]
pub struct User(pub Participant);

#[async_trait]
impl<S> FromRequestParts<S> for User
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let participant = parts
            .extensions
            .get::<Participant>()
            .cloned()
            .ok_or(AppError::Unauthenticated)?;
        Ok(User(participant))
    }
}

/// Stricter guard: the caller must hold the staff role.
#[derive(Debug, Clone)]
pub struct StaffUser(pub Participant);

#[async_trait]
impl<S> FromRequestParts<S> for StaffUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let User(participant) = User::from_request_parts(parts, state).await?;
        if !participant.is_staff() {
            return Err(AppError::Forbidden("staff role required".into()));
        }
        Ok(StaffUser(participant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use axum::http::Request;
    use uuid::Uuid;

    fn parts_with(participant: Option<Participant>) -> Parts {
        let mut request = Request::builder().body(()).unwrap();
        if let Some(p) = participant {
            request.extensions_mut().insert(p);
        }
        request.into_parts().0
    }

    fn student() -> Participant {
        Participant {
            id: Uuid::new_v4(),
            display_name: "amina".into(),
            role: Role::Student,
        }
    }

    #[tokio::test]
    async fn user_guard_requires_resolved_participant() {
        let mut parts = parts_with(None);
        assert!(matches!(
            User::from_request_parts(&mut parts, &()).await,
            Err(AppError::Unauthenticated)
        ));

        let mut parts = parts_with(Some(student()));
        assert!(User::from_request_parts(&mut parts, &()).await.is_ok());
    }

    #[tokio::test]
    async fn staff_guard_rejects_students() {
        let mut parts = parts_with(Some(student()));
        assert!(matches!(
            StaffUser::from_request_parts(&mut parts, &()).await,
            Err(AppError::Forbidden(_))
        ));

        let staff = Participant {
            role: Role::Staff,
            ..student()
        };
        let mut parts = parts_with(Some(staff));
        assert!(StaffUser::from_request_parts(&mut parts, &()).await.is_ok());
    }
}
