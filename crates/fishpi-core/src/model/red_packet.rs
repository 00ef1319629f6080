//! Red packet opening: gesture choice and claim result.

use serde::Deserialize;

/// Rock-paper-scissors gesture, wire value in parentheses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Rock,
    Scissors,
    Paper,
}

impl Gesture {
    pub fn wire(self) -> u8 {
        match self {
            Gesture::Rock => 0,
            Gesture::Scissors => 1,
            Gesture::Paper => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Gesture::Rock => "石头",
            Gesture::Scissors => "剪刀",
            Gesture::Paper => "布",
        }
    }

    /// Chat-room command digits `1`..`3`.
    pub fn from_command(cmd: &str) -> Option<Self> {
        match cmd {
            "1" => Some(Gesture::Rock),
            "2" => Some(Gesture::Scissors),
            "3" => Some(Gesture::Paper),
            _ => None,
        }
    }

    /// Weighted pick from a roll in `0..10`: 3 rock, 4 scissors, 3 paper.
    pub fn from_roll(roll: u32) -> Self {
        match roll {
            0..=2 => Gesture::Rock,
            3..=6 => Gesture::Scissors,
            _ => Gesture::Paper,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClaimEntry {
    pub user_money: i64,
    pub time: String,
    pub avatar: String,
    pub user_name: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClaimInfo {
    /// Blessing text.
    pub msg: String,
    pub count: i64,
    /// Sender.
    pub user_name: String,
    pub got: i64,
}

/// Reply of the open-red-packet call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClaimResult {
    pub who: Vec<ClaimEntry>,
    pub info: ClaimInfo,
}

impl ClaimResult {
    /// What `me` got out of it.
    pub fn outcome(&self, me: &str) -> String {
        match self.who.iter().find(|w| w.user_name == me) {
            Some(w) if w.user_money < 0 => format!("血亏 损失到了{}积分", -w.user_money),
            Some(w) if w.user_money > 0 => format!("真牛 领取到了{}积分", w.user_money),
            Some(_) => "你抢了个寂寞".to_string(),
            None => "但是没有领取到欸".to_string(),
        }
    }

    pub fn render(&self, me: &str) -> String {
        let claims = self
            .who
            .iter()
            .map(|w| format!("- {} {} 抢到了{}积分", w.time, w.user_name, w.user_money))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "你打开{}发的红包({}/{}) {}\n 领取情况：\n{}\n\n{}",
            self.info.user_name,
            self.info.got,
            self.info.count,
            self.outcome(me),
            claims,
            self.info.msg
        )
    }
}
