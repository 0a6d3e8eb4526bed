use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Barber {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub surname: String,
    pub description: Option<String>,
}

impl Barber {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.name, self.surname)
    }
}
