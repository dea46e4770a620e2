//! Remote translation job service
//!
//! The tracker never speaks HTTP directly; it goes through the [`Backend`]
//! trait. [`HttpBackend`] implements it against the backend's `/api/*`
//! endpoints:
//!
//! | Operation | Endpoint |
//! |-----------|----------|
//! | upload    | `POST /api/upload` |
//! | translate | `POST /api/translate` |
//! | status    | `GET /api/status/{task_id}` |
//! | catalog   | `GET /api/config` |
//! | cancel    | `POST /api/cancel/{task_id}` |
//! | download  | `GET /api/download_task/{task_id}[/mono\|/dual]` |

mod http;
mod traits;
mod wire;


pub use http::HttpBackend;
pub use traits::{Backend, TranslateSource};
