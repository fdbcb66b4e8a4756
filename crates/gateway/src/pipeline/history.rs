//! History substitution and the optional companion prompt.
//!
//! Past turns are pasted into the system template at the `{history}`
//! marker. Because the template is later run through marker
//! substitution again (for `{context}`), every brace in the recalled
//! history is escaped first so user- or model-authored text can never
//! open a marker of its own.

use cr_domain::chat::{History, UserMessageInput};
use cr_domain::config::ChatConfig;
use cr_domain::error::Result;
use cr_store::HistoryRepository;

use crate::prompts::PromptCatalog;

/// Marker in a template where recalled history is inserted.
pub const HISTORY_MARKER: &str = "{history}";
/// Marker in the companion function template for the current question.
pub const QUESTION_MARKER: &str = "{question}";

/// Recall up to `max_turns` of conversation and substitute them into
/// `template` at the `{history}` marker.
///
/// Escaping happens before substitution. The order matters: escaping
/// afterwards would corrupt the markers still pending in the template.
pub async fn add_history(
    template: &str,
    chat_id: uuid::Uuid,
    repo: &dyn HistoryRepository,
    max_turns: usize,
) -> Result<History> {
    let recalled = repo.get_prompt_history(chat_id, max_turns).await?;
    let escaped = escape_braces(&recalled);

    Ok(History {
        template_with_history: template.replacen(HISTORY_MARKER, &escaped, 1),
        formatted_history: escaped,
    })
}

/// Build the secondary companion prompt, or `None` when companion mode
/// is off. The companion function template gets the same history
/// treatment as the system template, then the current question is
/// substituted in.
pub async fn companion_prompt(
    input: &UserMessageInput,
    repo: &dyn HistoryRepository,
    catalog: &PromptCatalog,
    chat_cfg: &ChatConfig,
) -> Result<Option<String>> {
    if chat_cfg.companion_url.is_none() {
        return Ok(None);
    }
    let Some(template) = catalog.companion_function_message() else {
        return Ok(None);
    };

    let with_history =
        add_history(template, input.chat_id, repo, chat_cfg.history_turns).await?;
    let prompt = with_history
        .template_with_history
        .replacen(QUESTION_MARKER, &input.message, 1);
    Ok(Some(prompt))
}

fn escape_braces(text: &str) -> String {
    text.replace('{', "{{").replace('}', "}}")
}
