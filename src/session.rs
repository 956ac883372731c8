// SPDX-License-Identifier: MIT OR Apache-2.0

//! Caller identity and session claims.
//!
//! Authentication and session bookkeeping live outside this crate. The surrounding handler layer
//! verifies the caller against the identity provider and the course's active session, then passes
//! the result in as a [`Caller`]. The engine only checks the flags.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::course::UserId;

/// Access level of a user document.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

/// Verified claims about the caller of a gameplay operation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Caller {
    /// No authenticated user behind the request.
    Anonymous,

    /// An authenticated user.
    User {
        id: UserId,
        role: Role,
        /// Whether the user's course currently has an unexpired session.
        active_session: bool,
    },
}

impl Caller {
    /// An authenticated student inside an active class session.
    pub fn student(id: impl Into<UserId>) -> Self {
        Caller::User {
            id: id.into(),
            role: Role::Student,
            active_session: true,
        }
    }

    /// The caller's identity, when authenticated as a student in an active session.
    pub fn ensure_student(&self) -> Result<&UserId, AccessError> {
        match self {
            Caller::Anonymous => Err(AccessError::NotAuthenticated),
            Caller::User { role, .. } if *role != Role::Student => Err(AccessError::NotAStudent),
            Caller::User {
                active_session: false,
                ..
            } => Err(AccessError::NoActiveSession),
            Caller::User { id, .. } => Ok(id),
        }
    }

    /// The caller's identity, when authenticated as a teacher or admin.
    pub fn ensure_teacher(&self) -> Result<&UserId, AccessError> {
        match self {
            Caller::Anonymous => Err(AccessError::NotAuthenticated),
            Caller::User {
                role: Role::Student,
                ..
            } => Err(AccessError::NotATeacher),
            Caller::User { id, .. } => Ok(id),
        }
    }
}

/// Precondition failures around identity and session state.
///
/// These indicate a caller error and are never retried.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum AccessError {
    #[error("user must be authenticated")]
    NotAuthenticated,

    #[error("user is not a student or is not in a class")]
    NotAStudent,

    #[error("user must be a teacher")]
    NotATeacher,

    #[error("user's course is not in session")]
    NoActiveSession,
}

#[cfg(test)]
mod tests {
    use super::{AccessError, Caller, Role};

    #[test]
    fn student_preconditions() {
        assert_eq!(
            Caller::Anonymous.ensure_student(),
            Err(AccessError::NotAuthenticated)
        );

        let teacher = Caller::User {
            id: "t-1".into(),
            role: Role::Teacher,
            active_session: true,
        };
        assert_eq!(teacher.ensure_student(), Err(AccessError::NotAStudent));

        let outside_session = Caller::User {
            id: "s-1".into(),
            role: Role::Student,
            active_session: false,
        };
        assert_eq!(
            outside_session.ensure_student(),
            Err(AccessError::NoActiveSession)
        );

        let student = Caller::student("s-2");
        assert_eq!(student.ensure_student().unwrap().as_str(), "s-2");
    }

    #[test]
    fn teacher_preconditions() {
        assert_eq!(
            Caller::Anonymous.ensure_teacher(),
            Err(AccessError::NotAuthenticated)
        );
        assert_eq!(
            Caller::student("s-1").ensure_teacher(),
            Err(AccessError::NotATeacher)
        );

        let admin = Caller::User {
            id: "a-1".into(),
            role: Role::Admin,
            active_session: false,
        };
        assert!(admin.ensure_teacher().is_ok());
    }
}
