//! Plain-text rendering of a [`VotingView`].

use ballot_client::{AppMetadata, VotingView};
use ballot_types::VotingWindow;
use std::fmt::Write;

/// App name and description, then the site it is served from.
pub fn header(metadata: &AppMetadata) -> String {
    let mut out = format!("{}\n", metadata.name);
    if !metadata.description.is_empty() {
        let _ = writeln!(out, "{}", metadata.description);
    }
    if !metadata.url.is_empty() {
        let _ = writeln!(out, "{}", metadata.url);
    }
    out
}

/// Account, connection and voting-window summary.
pub fn status(view: &VotingView, now: u64) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", view.account_label());
    let _ = writeln!(out, "{}", view.status_line());
    match (view.window, view.window_label()) {
        (Some(window), Some(label)) => {
            let _ = writeln!(out, "Voting dates: {label} ({})", phase(&window, now));
        }
        _ => {
            let _ = writeln!(out, "Voting dates: not set");
        }
    }
    if let Some(message) = &view.message {
        let _ = writeln!(out, "{message}");
    }
    out
}

fn phase(window: &VotingWindow, now: u64) -> &'static str {
    if window.is_open(now) {
        "open"
    } else if now < window.start {
        "not started"
    } else {
        "closed"
    }
}

/// One row per candidate, in ledger id order.
pub fn candidates(view: &VotingView) -> String {
    if view.candidates.is_empty() {
        return "No candidates\n".to_string();
    }
    let mut out = format!("{:>4}  {:<24} {:<16} {:>8}\n", "ID", "NAME", "PARTY", "VOTES");
    for c in &view.candidates {
        let _ = writeln!(
            out,
            "{:>4}  {:<24} {:<16} {:>8}",
            c.id, c.name, c.party, c.vote_count
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballot_client::Status;
    use ballot_types::{AccountAddress, Candidate, CandidateId, ChainId};

    fn bound_view() -> VotingView {
        VotingView {
            status: Status::Bound,
            account: AccountAddress::parse("0x00000000000000000000000000000000000000aa").ok(),
            chain_id: Some(ChainId::SEPOLIA),
            network_name: Some("Sepolia".into()),
            candidates: vec![
                Candidate {
                    id: CandidateId::new(1).unwrap(),
                    name: "Alice".into(),
                    party: "Red".into(),
                    vote_count: 3,
                },
                Candidate {
                    id: CandidateId::new(3).unwrap(),
                    name: "Carol".into(),
                    party: "Green".into(),
                    vote_count: 0,
                },
            ],
            window: Some(VotingWindow::new(1_704_067_200, 1_706_832_000)),
            has_voted: Some(false),
            vote_enabled: true,
            message: None,
        }
    }

    #[test]
    fn status_shows_window_phase() {
        let view = bound_view();
        let text = status(&view, 1_704_067_200);
        assert!(text.contains("Your Account: 0x00000000000000000000000000000000000000aa"));
        assert!(text.contains("Connected to Sepolia (11155111)"));
        assert!(text.contains("Voting dates: Mon Jan 01 2024 - Fri Feb 02 2024 (open)"));
        assert!(status(&view, 1).contains("(not started)"));
        assert!(status(&view, 1_706_832_000).contains("(closed)"));
    }

    #[test]
    fn status_without_dates() {
        let view = VotingView {
            window: None,
            ..bound_view()
        };
        assert!(status(&view, 0).contains("Voting dates: not set"));
    }

    #[test]
    fn candidate_rows_keep_ledger_ids() {
        let text = candidates(&bound_view());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].trim_start().starts_with("1  Alice"));
        assert!(lines[2].trim_start().starts_with("3  Carol"));
    }

    #[test]
    fn header_skips_empty_fields() {
        let metadata = AppMetadata {
            name: "Town Ballot".into(),
            description: String::new(),
            url: "https://ballot.example.org".into(),
            icons: Vec::new(),
        };
        assert_eq!(header(&metadata), "Town Ballot\nhttps://ballot.example.org\n");
        assert!(header(&AppMetadata::default()).starts_with("Decentralized Voting System\n"));
    }

    #[test]
    fn empty_candidate_list() {
        assert_eq!(candidates(&VotingView::disconnected()), "No candidates\n");
    }
}
