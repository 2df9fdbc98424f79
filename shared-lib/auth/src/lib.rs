//! Key material loading and HS256 token minting for ejabberd JWT authentication.
//!
//! ```rust,ignore
//! use auth::{ClaimsProfile, KeyMaterial, TokenMinter};
//!
//! let key = KeyMaterial::from_jwk_b64(&blob)?;
//! let minter = TokenMinter::new(key, ClaimsProfile::xmpp())?;
//! let token = minter.mint("test@ejabberd.local")?;
//! ```

pub mod base64url;
mod claims;
mod jwk;
mod token;

pub use claims::{ClaimsProfile, ClaimsSet, IdentityClaim, Jid};
pub use error::AuthError;
pub use jwk::{KeyMaterial, OCT_KEY_TYPE};
pub use token::{
    decode_token, encode_token, DecodedToken, TokenHeader, TokenMinter, ALGORITHM, TOKEN_TYPE,
};
