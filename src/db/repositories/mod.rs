pub mod session_state;
