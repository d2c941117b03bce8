//! Results bar chart for a single poll.

use crate::Poll;

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub votes: u64,
    /// Bar length relative to the longest bar, `0.0..=100.0`.
    pub length_pct: f64,
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartModel {
    pub poll_id: String,
    pub bars: Vec<Bar>,
}

impl ChartModel {
    pub fn from_poll(poll: &Poll) -> Self {
        let max = poll.votes.iter().copied().max().unwrap_or(0);
        let bars = poll
            .options
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let votes = poll.votes.get(i).copied().unwrap_or(0);
                let length_pct = if max == 0 {
                    0.0
                } else {
                    votes as f64 / max as f64 * 100.0
                };
                Bar {
                    label: label.clone(),
                    votes,
                    length_pct,
                    tooltip: format!(
                        "{label}: {votes} ({:.1}%)",
                        share_pct(votes, poll.total_votes)
                    ),
                }
            })
            .collect();

        Self {
            poll_id: poll.id.clone(),
            bars,
        }
    }

    /// Longest tally, used for the axis label.
    pub fn max_votes(&self) -> u64 {
        self.bars.iter().map(|bar| bar.votes).max().unwrap_or(0)
    }
}

fn share_pct(votes: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    votes as f64 / total as f64 * 100.0
}

/// The chart currently on the page, numbered in the order it was shown.
#[derive(Debug, PartialEq)]
pub struct Chart {
    pub generation: u64,
    pub model: ChartModel,
}

/// Holds the one chart allowed on the page.
///
/// `show` clears the previous chart before building the next one; the view
/// renders whatever `current` holds, and `disposed` counts the charts that
/// were taken down.
#[derive(Debug, Default)]
pub struct ResultsSlot {
    current: Option<Chart>,
    generation: u64,
    disposed: u64,
}

impl ResultsSlot {
    pub fn show(&mut self, poll: &Poll) -> &Chart {
        self.clear();
        self.generation += 1;
        self.current.insert(Chart {
            generation: self.generation,
            model: ChartModel::from_poll(poll),
        })
    }

    pub fn clear(&mut self) {
        if let Some(old) = self.current.take() {
            log::trace!("Disposing results chart #{}", old.generation);
            self.disposed += 1;
        }
    }

    pub fn current(&self) -> Option<&Chart> {
        self.current.as_ref()
    }

    pub fn disposed(&self) -> u64 {
        self.disposed
    }
}

/// Whether the detail view shows results at all.
pub fn should_show_results(poll: &Poll, has_voted: bool) -> bool {
    has_voted || poll.has_any_votes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample_poll;

    fn tea_poll() -> Poll {
        Poll {
            id: "p1".into(),
            question: "Tea?".into(),
            options: vec!["A".into(), "B".into()],
            votes: vec![3, 7],
            total_votes: 10,
            created_at: String::new(),
        }
    }

    #[test]
    fn bars_are_proportional() {
        let model = ChartModel::from_poll(&tea_poll());
        assert_eq!(model.bars.len(), 2);

        let (a, b) = (&model.bars[0], &model.bars[1]);
        assert!((a.length_pct / b.length_pct - 3.0 / 7.0).abs() < 1e-9);
        assert_eq!(b.length_pct, 100.0);
        assert_eq!(b.tooltip, "B: 7 (70.0%)");
        assert_eq!(a.tooltip, "A: 3 (30.0%)");
        assert_eq!(model.max_votes(), 7);
    }

    #[test]
    fn zero_votes_give_empty_bars() {
        let mut poll = sample_poll("p2", 0, "");
        poll.votes = vec![0, 0];
        let model = ChartModel::from_poll(&poll);
        assert!(model.bars.iter().all(|bar| bar.length_pct == 0.0));
        assert_eq!(model.bars[0].tooltip, "Yes: 0 (0.0%)");
    }

    #[test]
    fn missing_tallies_count_as_zero() {
        let poll = sample_poll("p3", 0, "");
        let model = ChartModel::from_poll(&poll);
        assert_eq!(model.bars.len(), 2);
        assert!(model.bars.iter().all(|bar| bar.votes == 0));
    }

    #[test]
    fn slot_disposes_before_replacing() {
        let mut slot = ResultsSlot::default();
        assert!(slot.current().is_none());

        assert_eq!(slot.show(&tea_poll()).generation, 1);
        assert_eq!(slot.disposed(), 0);

        let mut other = tea_poll();
        other.id = "p2".into();
        assert_eq!(slot.show(&other).generation, 2);
        assert_eq!(slot.disposed(), 1);
        assert_eq!(slot.current().map(|c| c.model.poll_id.as_str()), Some("p2"));

        slot.clear();
        slot.clear();
        assert!(slot.current().is_none());
        assert_eq!(slot.disposed(), 2);
    }

    #[test]
    fn results_visibility() {
        let mut poll = sample_poll("p1", 0, "");
        poll.votes = vec![0, 0];
        assert!(!should_show_results(&poll, false));
        assert!(should_show_results(&poll, true));
        poll.votes = vec![0, 1];
        assert!(should_show_results(&poll, false));
    }
}
