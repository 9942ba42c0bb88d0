/// Words of one line joined in reading order, with a confidence weighted by
/// character count.
#[derive(Debug, Default)]
pub(super) struct LineText {
    text: String,
    weighted_conf: f32,
    chars: usize,
}

impl LineText {
    pub(super) fn push(&mut self, word: &str, conf: f32) {
        let word = word.trim();
        if word.is_empty() {
            return;
        }
        if wants_separator(&self.text, word) {
            self.text.push(' ');
        }
        self.text.push_str(word);
        let count = word.chars().count();
        self.weighted_conf += conf * count as f32;
        self.chars += count;
    }

    pub(super) fn is_empty(&self) -> bool {
        self.chars == 0
    }

    pub(super) fn confidence(&self) -> f32 {
        if self.chars == 0 {
            return 0.0;
        }
        self.weighted_conf / self.chars as f32
    }

    pub(super) fn into_text(self) -> String {
        self.text
    }
}

/// Japanese and Chinese run together; two latin or digit words keep a
/// space between them.
fn wants_separator(left: &str, right: &str) -> bool {
    match (left.chars().last(), right.chars().next()) {
        (Some(a), Some(b)) => {
            !is_wide_script(a) && !is_wide_script(b) && a.is_alphanumeric() && b.is_alphanumeric()
        }
        _ => false,
    }
}

fn is_wide_script(ch: char) -> bool {
    matches!(
        ch as u32,
        0x3040..=0x30FF | 0x31F0..=0x31FF | 0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xFF66..=0xFF9F
    )
}
