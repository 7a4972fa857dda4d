pub mod feed_websocket;
pub mod session_routes;
