//! Round standings and end-of-round summary
//!
//! Ranks every ball of the round by score; the live leaderboard shows the top 10.

use serde::Serialize;

use crate::sim::{Ball, BallId, BallKind, Color};

/// Number of entries shown on the live leaderboard
pub const LEADERBOARD_SIZE: usize = 10;

/// A single ranked ball
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StandingEntry {
    /// 1-indexed rank
    pub rank: usize,
    pub id: BallId,
    pub name: String,
    pub kind: BallKind,
    pub score: u32,
    pub radius: f32,
    pub color: Color,
    /// Still in play
    pub active: bool,
}

/// All balls of a round, ranked by score
#[derive(Debug, Clone, Default, Serialize)]
pub struct Standings {
    pub entries: Vec<StandingEntry>,
}

impl Standings {
    /// Rank balls by score (descending); equal scores keep id order
    pub fn from_balls(balls: &[Ball]) -> Self {
        let mut sorted: Vec<&Ball> = balls.iter().collect();
        sorted.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));

        let entries = sorted
            .into_iter()
            .enumerate()
            .map(|(i, ball)| StandingEntry {
                rank: i + 1,
                id: ball.id,
                name: ball.name.clone(),
                kind: ball.kind(),
                score: ball.score,
                radius: ball.radius,
                color: ball.color,
                active: ball.active,
            })
            .collect();

        Self { entries }
    }

    /// Entries for the live leaderboard
    pub fn top(&self) -> &[StandingEntry] {
        &self.entries[..self.entries.len().min(LEADERBOARD_SIZE)]
    }

    pub fn rank_of(&self, id: BallId) -> Option<usize> {
        self.entries.iter().find(|e| e.id == id).map(|e| e.rank)
    }

    pub fn leader(&self) -> Option<&StandingEntry> {
        self.entries.first()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Format seconds as `MM:SS.T` (tenths truncated)
pub fn format_elapsed(secs: f32) -> String {
    let tenths_total = (secs.max(0.0) * 10.0).floor() as u64;
    let tenths = tenths_total % 10;
    let whole = tenths_total / 10;
    format!("{:02}:{:02}.{}", whole / 60, whole % 60, tenths)
}

/// Title and message shown when a round ends
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundSummary {
    pub title: String,
    pub message: String,
}

impl RoundSummary {
    pub fn new(winner: Option<&Ball>, elapsed_secs: f32) -> Self {
        let (title, message) = match winner {
            Some(w) if w.is_player() => (
                "Victory!",
                format!(
                    "Congratulations, {}! You dominated the arena with a score of {}.",
                    w.name, w.score
                ),
            ),
            Some(w) => (
                "Game Over",
                format!("{} won the game with a score of {}.", w.name, w.score),
            ),
            None => (
                "Game Over",
                "The game has ended with no survivors.".to_string(),
            ),
        };

        Self {
            title: title.to_string(),
            message: format!("{message} Game duration: {}", format_elapsed(elapsed_secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn ball(id: BallId, score: u32) -> Ball {
        let mut b = Ball::new_bot(id, format!("Bot {id}"), Vec2::ZERO, 15.0, Color::WHITE);
        b.score = score;
        b
    }

    #[test]
    fn test_ranking_order() {
        let balls = vec![ball(0, 1), ball(1, 5), ball(2, 5), ball(3, 0)];
        let standings = Standings::from_balls(&balls);

        let ids: Vec<BallId> = standings.entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 0, 3]);
        assert_eq!(standings.rank_of(0), Some(3));
        assert_eq!(standings.leader().map(|e| e.id), Some(1));
    }

    #[test]
    fn test_top_ten() {
        let balls: Vec<Ball> = (0..20).map(|i| ball(i, i)).collect();
        let standings = Standings::from_balls(&balls);
        assert_eq!(standings.top().len(), LEADERBOARD_SIZE);
        assert_eq!(standings.top()[0].score, 19);

        let few = Standings::from_balls(&balls[..3]);
        assert_eq!(few.top().len(), 3);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0.0), "00:00.0");
        assert_eq!(format_elapsed(5.25), "00:05.2");
        assert_eq!(format_elapsed(83.99), "01:23.9");
        assert_eq!(format_elapsed(600.0), "10:00.0");
    }

    #[test]
    fn test_summary_messages() {
        let mut player = Ball::new_player(0, "Ada".into(), Vec2::ZERO, 30.0, Color::WHITE);
        player.score = 19;
        let summary = RoundSummary::new(Some(&player), 65.0);
        assert_eq!(summary.title, "Victory!");
        assert_eq!(
            summary.message,
            "Congratulations, Ada! You dominated the arena with a score of 19. Game duration: 01:05.0"
        );

        let bot = ball(3, 7);
        let summary = RoundSummary::new(Some(&bot), 1.0);
        assert_eq!(summary.title, "Game Over");
        assert!(summary.message.starts_with("Bot 3 won the game with a score of 7."));

        let summary = RoundSummary::new(None, 1.0);
        assert!(summary.message.starts_with("The game has ended with no survivors."));
    }
}
