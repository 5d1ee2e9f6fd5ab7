//! Full render snapshot pushed to the UI on every state change.

use ballot_types::{AccountAddress, Candidate, ChainId, VotingWindow};
use ballot_utils::format_date;
use serde::Serialize;

/// Connection status as shown to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Disconnected,
    Connecting,
    Bound,
    Unsupported,
}

/// Everything the UI renders. Always replaced whole; there is no diff.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VotingView {
    pub status: Status,
    pub account: Option<AccountAddress>,
    pub chain_id: Option<ChainId>,
    pub network_name: Option<String>,
    pub candidates: Vec<Candidate>,
    pub window: Option<VotingWindow>,
    pub has_voted: Option<bool>,
    pub vote_enabled: bool,
    pub message: Option<String>,
}

impl VotingView {
    pub fn disconnected() -> Self {
        Self {
            status: Status::Disconnected,
            account: None,
            chain_id: None,
            network_name: None,
            candidates: Vec::new(),
            window: None,
            has_voted: None,
            vote_enabled: false,
            message: None,
        }
    }

    /// `Your Account: 0x…` or `Not connected`.
    pub fn account_label(&self) -> String {
        match &self.account {
            Some(account) => format!("Your Account: {account}"),
            None => "Not connected".to_string(),
        }
    }

    /// `Mon Jan 01 2024 - Fri Feb 02 2024`, or `None` before dates are set.
    pub fn window_label(&self) -> Option<String> {
        self.window
            .map(|w| format!("{} - {}", format_date(w.start), format_date(w.end)))
    }

    /// Line describing why voting is or is not possible.
    pub fn status_line(&self) -> String {
        match self.status {
            Status::Disconnected => "Connect your wallet to vote".to_string(),
            Status::Connecting => "Connecting…".to_string(),
            Status::Unsupported => format!(
                "Voting is not available on {}; switch network",
                self.network_label()
            ),
            Status::Bound if self.has_voted == Some(true) => {
                "You have already voted".to_string()
            }
            Status::Bound => format!("Connected to {}", self.network_label()),
        }
    }

    fn network_label(&self) -> String {
        match (&self.network_name, self.chain_id) {
            (Some(name), Some(id)) => format!("{name} ({id})"),
            (None, Some(id)) => format!("chain {id}"),
            _ => "this network".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disconnected_view_disables_voting() {
        let view = VotingView::disconnected();
        assert!(!view.vote_enabled);
        assert_eq!(view.account_label(), "Not connected");
        assert!(view.window_label().is_none());
    }

    #[test]
    fn unsupported_names_the_chain() {
        let view = VotingView {
            status: Status::Unsupported,
            chain_id: Some(ChainId::new(1337)),
            ..VotingView::disconnected()
        };
        assert_eq!(
            view.status_line(),
            "Voting is not available on chain 1337; switch network"
        );
    }

    #[test]
    fn window_label_formats_both_days() {
        let view = VotingView {
            window: Some(VotingWindow::new(1_704_067_200, 1_706_832_000)),
            ..VotingView::disconnected()
        };
        assert_eq!(
            view.window_label().as_deref(),
            Some("Mon Jan 01 2024 - Fri Feb 02 2024")
        );
    }
}
