pub mod action_resolver;
pub mod phase_clock;
pub mod role_assigner;
pub mod session_manager;
pub mod vote_tally;
pub mod win_evaluator;
