use crate::auth::jwt::{TokenType, verify_token};
use crate::config::Config;
use crate::model::role::Role;
use actix_web::error::{ErrorForbidden, ErrorInternalServerError, ErrorUnauthorized};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // set by auth_middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => return ready(Err(ErrorInternalServerError("Config missing"))),
        };

        ready(AuthUser::from_token(token, &config.jwt_secret).map_err(ErrorUnauthorized))
    }
}

impl AuthUser {
    /// Verifies an access token and resolves its role.
    pub fn from_token(token: &str, secret: &str) -> Result<Self, &'static str> {
        let claims = verify_token(token, secret).map_err(|_| "Invalid token")?;
        if claims.token_type != TokenType::Access {
            return Err("Access token required");
        }
        let role = Role::from_id(claims.role).ok_or("Invalid role")?;

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
            employee_id: claims.employee_id,
        })
    }

    /// The caller's own employee id. Accounts without an employee profile
    /// cannot clock in.
    pub fn employee(&self) -> actix_web::Result<u64> {
        self.employee_id
            .ok_or_else(|| ErrorForbidden("No employee profile"))
    }

    /// Employee whose records a read targets: the caller by default, anyone
    /// for HR/Admin, and only themselves for everyone else.
    pub fn resolve_target(&self, requested: Option<u64>) -> actix_web::Result<u64> {
        match requested {
            Some(id) if self.role.is_supervisor() => Ok(id),
            Some(id) if self.employee_id == Some(id) => Ok(id),
            Some(_) => Err(ErrorForbidden("HR/Admin only")),
            None => self.employee(),
        }
    }

    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        if self.role.is_supervisor() {
            Ok(())
        } else {
            Err(ErrorForbidden("HR/Admin only"))
        }
    }

    pub fn require_sweeper(&self) -> actix_web::Result<()> {
        if self.role.can_run_sweeps() {
            Ok(())
        } else {
            Err(ErrorForbidden("HR/Admin/System only"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, employee_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id: 1,
            username: "u".into(),
            role,
            employee_id,
        }
    }

    #[test]
    fn employees_only_see_their_own_records() {
        let emp = user(Role::Employee, Some(10));
        assert_eq!(emp.resolve_target(None).unwrap(), 10);
        assert_eq!(emp.resolve_target(Some(10)).unwrap(), 10);
        assert!(emp.resolve_target(Some(11)).is_err());
    }

    #[test]
    fn hr_can_target_anyone_but_needs_a_profile_for_self() {
        let hr = user(Role::Hr, None);
        assert_eq!(hr.resolve_target(Some(11)).unwrap(), 11);
        assert!(hr.resolve_target(None).is_err());
        assert!(hr.employee().is_err());
    }

    #[test]
    fn sweeps_and_reviews_are_gated_by_role() {
        assert!(user(Role::System, None).require_sweeper().is_ok());
        assert!(user(Role::System, None).require_hr_or_admin().is_err());
        assert!(user(Role::Employee, Some(1)).require_sweeper().is_err());
    }

    #[test]
    fn refresh_tokens_are_refused() {
        use crate::auth::jwt::Claims;
        use jsonwebtoken::{EncodingKey, Header, encode};

        let claims = Claims {
            user_id: 1,
            sub: "u".into(),
            role: 3,
            exp: usize::MAX / 2,
            jti: "j".into(),
            token_type: TokenType::Refresh,
            employee_id: Some(1),
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"s")).unwrap();

        assert_eq!(AuthUser::from_token(&token, "s").unwrap_err(), "Access token required");
    }
}
