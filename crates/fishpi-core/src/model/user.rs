//! User profile summary.

use serde::Deserialize;

use super::{local_time_millis, string_or_number};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserInfo {
    pub user_city: String,
    pub user_online_flag: bool,
    pub user_point: i64,
    #[serde(deserialize_with = "string_or_number")]
    pub user_app_role: String,
    pub user_intro: String,
    #[serde(deserialize_with = "string_or_number")]
    pub user_no: String,
    pub online_minute: i64,
    pub user_nickname: String,
    /// Registration time in Unix milliseconds, as a string.
    #[serde(deserialize_with = "string_or_number")]
    pub o_id: String,
    pub user_name: String,
    pub following_user_count: i64,
    /// JSON document: `{"list":[{"name":..,"description":..}]}`.
    pub sys_metal: String,
    pub user_role: String,
    pub follower_count: i64,
    #[serde(rename = "userURL")]
    pub user_url: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetalList {
    list: Vec<Metal>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Metal {
    name: String,
    description: String,
}

impl UserInfo {
    pub fn online_state(&self) -> &'static str {
        if self.user_online_flag {
            "√"
        } else {
            "×"
        }
    }

    pub fn app_role(&self) -> &str {
        match self.user_app_role.as_str() {
            "0" => "黑客",
            "1" => "画家",
            other => other,
        }
    }

    pub fn online_time(&self) -> String {
        let minutes = self.online_minute % 60;
        let hours = self.online_minute / 60;
        if hours < 24 {
            return format!("{hours}小时{minutes}分钟");
        }
        format!("{}天{}小时{}分钟", hours / 24, hours % 24, minutes)
    }

    fn metals(&self) -> Option<Vec<String>> {
        if self.sys_metal.is_empty() {
            return None;
        }
        match serde_json::from_str::<MetalList>(&self.sys_metal) {
            Ok(m) => Some(
                m.list
                    .into_iter()
                    .map(|v| format!("\t{}-{}", v.name, v.description))
                    .collect(),
            ),
            Err(e) => {
                tracing::debug!(user = %self.user_name, error = %e, "medal list unparsable");
                None
            }
        }
    }

    pub fn render(&self) -> String {
        let registered = self
            .o_id
            .parse::<i64>()
            .map(local_time_millis)
            .unwrap_or_default();
        let mut info = format!(
            "{} - {}({}) {}\n介绍信息：{}\n链接：{}\n角色：{}({})\t城市：{}\n积分：{}\t在线{}\n关注数：{}\t被关注数：{}\n注册时间：{}\n",
            self.user_no,
            self.user_nickname,
            self.user_name,
            self.online_state(),
            self.user_intro,
            self.user_url,
            self.user_role,
            self.app_role(),
            self.user_city,
            self.user_point,
            self.online_time(),
            self.following_user_count,
            self.follower_count,
            registered,
        );
        if let Some(metals) = self.metals() {
            info.push_str("徽章列表：\n");
            info.push_str(&metals.join("\n"));
            info.push('\n');
        }
        info
    }
}
