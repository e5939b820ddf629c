/// IMS SMS retry state machine - Stateright Model
/// Checks the send / retry / fallback lifecycle of a single message.
///
/// Run with: cargo test --release sms_model -- --nocapture

use stateright::*;

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum MessagePhase {
    Idle,
    /// Waiting for an IMS result
    PendingIms { retry_count: u32 },
    /// Handed to the circuit-switched path
    FellBack { retry_count: u32 },
    Delivered,
    Failed,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum SmsAction {
    Send,
    ResultOk,
    ResultError,
    ResultRetry,
    ResultFallback,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct MessageModel {
    pub phase: MessagePhase,
    /// TP-RD bit of the PDU most recently handed to IMS
    pub reject_duplicates: bool,
    pub ims_sends: u32,
    pub cs_handoffs: u32,
}

#[derive(Clone)]
pub struct SmsRetryChecker {
    pub max_retries: u32,
}

impl Default for SmsRetryChecker {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

impl Model for SmsRetryChecker {
    type State = MessageModel;
    type Action = SmsAction;

    fn init_states(&self) -> Vec<Self::State> {
        vec![MessageModel {
            phase: MessagePhase::Idle,
            reject_duplicates: false,
            ims_sends: 0,
            cs_handoffs: 0,
        }]
    }

    fn actions(&self, state: &Self::State, actions: &mut Vec<Self::Action>) {
        match state.phase {
            MessagePhase::Idle => actions.push(SmsAction::Send),
            MessagePhase::PendingIms { .. } => {
                actions.push(SmsAction::ResultOk);
                actions.push(SmsAction::ResultError);
                actions.push(SmsAction::ResultRetry);
                actions.push(SmsAction::ResultFallback);
            }
            // CS and final phases take no further IMS results
            MessagePhase::FellBack { .. } | MessagePhase::Delivered | MessagePhase::Failed => {}
        }
    }

    fn next_state(&self, state: &Self::State, action: Self::Action) -> Option<Self::State> {
        let mut next = state.clone();

        match (action, &state.phase) {
            (SmsAction::Send, MessagePhase::Idle) => {
                next.phase = MessagePhase::PendingIms { retry_count: 0 };
                next.ims_sends += 1;
            }
            (SmsAction::ResultOk, MessagePhase::PendingIms { .. }) => {
                next.phase = MessagePhase::Delivered;
            }
            (SmsAction::ResultError, MessagePhase::PendingIms { .. }) => {
                next.phase = MessagePhase::Failed;
            }
            (SmsAction::ResultRetry, MessagePhase::PendingIms { retry_count }) => {
                if *retry_count >= self.max_retries {
                    next.phase = MessagePhase::Failed;
                } else {
                    next.phase = MessagePhase::PendingIms {
                        retry_count: retry_count + 1,
                    };
                    next.reject_duplicates = true;
                    next.ims_sends += 1;
                }
            }
            (SmsAction::ResultFallback, MessagePhase::PendingIms { retry_count }) => {
                next.phase = MessagePhase::FellBack {
                    retry_count: retry_count + 1,
                };
                next.cs_handoffs += 1;
            }
            _ => return None,
        }

        Some(next)
    }

    fn properties(&self) -> Vec<Property<Self>> {
        vec![
            // Safety: IMS retransmissions never exceed the ceiling
            Property::always("retry_ceiling", |model: &SmsRetryChecker, state: &MessageModel| {
                state.ims_sends <= model.max_retries + 1
            }),
            // Safety: every IMS retransmission carries TP-RD
            Property::always("retry_sets_reject_duplicates", |_, state: &MessageModel| {
                match state.phase {
                    MessagePhase::PendingIms { retry_count } => {
                        retry_count == 0 || state.reject_duplicates
                    }
                    _ => true,
                }
            }),
            // Safety: at most one CS handoff, always with a nonzero retry count
            Property::always("single_fallback", |_, state: &MessageModel| {
                state.cs_handoffs <= 1
                    && match state.phase {
                        MessagePhase::FellBack { retry_count } => {
                            retry_count > 0 && state.cs_handoffs == 1
                        }
                        _ => true,
                    }
            }),
            // Liveness: the message leaves IMS one way or another
            Property::eventually("message_settles", |_, state: &MessageModel| {
                matches!(
                    state.phase,
                    MessagePhase::Delivered | MessagePhase::Failed | MessagePhase::FellBack { .. }
                )
            }),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stateright::Checker;

    #[test]
    fn sms_model_check_properties() {
        let checker = SmsRetryChecker::default().checker().spawn_bfs().join();
        println!("States explored: {}", checker.unique_state_count());
        checker.assert_properties();
    }

    #[test]
    fn sms_model_check_single_retry_ceiling() {
        let checker = SmsRetryChecker { max_retries: 1 }
            .checker()
            .spawn_bfs()
            .join();
        checker.assert_properties();
    }

    #[test]
    fn sms_model_retry_then_fallback_path() {
        let model = SmsRetryChecker::default();
        let mut state = model.init_states()[0].clone();

        state = model.next_state(&state, SmsAction::Send).unwrap();
        assert_eq!(state.phase, MessagePhase::PendingIms { retry_count: 0 });
        assert!(!state.reject_duplicates);

        state = model.next_state(&state, SmsAction::ResultRetry).unwrap();
        assert_eq!(state.phase, MessagePhase::PendingIms { retry_count: 1 });
        assert!(state.reject_duplicates);
        assert_eq!(state.ims_sends, 2);

        state = model.next_state(&state, SmsAction::ResultFallback).unwrap();
        assert_eq!(state.phase, MessagePhase::FellBack { retry_count: 2 });
        assert_eq!(state.cs_handoffs, 1);

        // No IMS results once on the CS path
        assert!(model.next_state(&state, SmsAction::ResultOk).is_none());
    }

    #[test]
    fn sms_model_ceiling_fails() {
        let model = SmsRetryChecker::default();
        let mut state = model.next_state(&model.init_states()[0], SmsAction::Send).unwrap();
        for _ in 0..model.max_retries {
            state = model.next_state(&state, SmsAction::ResultRetry).unwrap();
        }
        state = model.next_state(&state, SmsAction::ResultRetry).unwrap();
        assert_eq!(state.phase, MessagePhase::Failed);
        assert_eq!(state.ims_sends, model.max_retries + 1);
    }
}
