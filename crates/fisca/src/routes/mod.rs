// Route handlers module.
//
// Each sub-module implements one endpoint's semantics, framework-free:
// request/response types, validation, and a typed handler error the HTTP
// layer maps to a status and a wire body.

pub mod ask;
pub mod billing;
pub mod health;
pub mod me;
pub mod messages;
pub mod signin;
pub mod signout;
pub mod signup;
