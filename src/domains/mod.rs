//! The three structured domains an agent can be evaluated in, each with
//! its own entity model and toolkit over a private database.

pub mod delivery;
pub mod instore;
pub mod ota;

use serde::{Deserialize, Deserializer};

use crate::config::Language;

/// Task file name for a `(domain, language)` pair; files live next to
/// each other in the domain's data directory.
pub fn task_file_name(language: Language) -> &'static str {
    match language {
        Language::English => "tasks_en.json",
        Language::Chinese => "tasks.json",
    }
}

/// Product attributes arrive either as a plain string or a list of
/// strings; lists are joined with ", ".
pub(crate) fn string_or_list<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        Text(String),
        List(Vec<String>),
    }

    Ok(match StringOrList::deserialize(deserializer)? {
        StringOrList::Text(text) => text,
        StringOrList::List(items) => items.join(", "),
    })
}
