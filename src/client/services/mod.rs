pub mod api_client;
pub mod auth_service;
pub mod chat_room;
pub mod chat_service;
pub mod comments_service;
pub mod events_service;
pub mod notifications_service;
pub mod response_shape;
pub mod restaurants_service;
pub mod reviews_service;
pub mod users_service;
pub mod websocket_client;
