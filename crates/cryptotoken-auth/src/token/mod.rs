//! JWT access tokens.
//!
//! - [`jwt`] - access token storage that signs and verifies tokens
//! - [`response_type`] - token endpoint responses carrying those tokens

pub mod jwt;
pub mod response_type;

pub use jwt::{BEARER_TOKEN_TYPE, JwtAccessTokenClaims, JwtAccessTokenStorage};
pub use response_type::{
    AccessTokenRequest, JwtAccessTokenResponseType, ResponseType, TOKEN_RESPONSE_TYPE,
    TokenResponse,
};
