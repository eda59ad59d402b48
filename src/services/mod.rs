/// OpenAPI documentation generation.
pub mod documentation;
/// Game bootstrap, joining, and lookups.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Gameplay command handling.
pub mod play_service;
/// Question supply orchestration (oracle, timeout, fallback, anti-repeat).
pub mod question_service;
/// Server-sent events broadcasting service.
pub mod sse_service;
/// Storage persistence supervisor with reconnect backoff.
pub mod storage_supervisor;
