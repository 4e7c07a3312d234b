//! Turns image bytes plus a note title into one candidate file name.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::Error;

/// One naming request, as handed to the vision service.
#[derive(Debug, Clone)]
pub struct NameRequest<'a> {
    /// `data:<mime>;base64,<bytes>`.
    pub image_data_url: String,
    /// Fixed naming instruction.
    pub instruction: &'a str,
    /// Title of the note the image was pasted into.
    pub note_title: &'a str,
}

/// A vision-capable model that answers a naming request with text.
pub trait VisionModel {
    /// Send one request. `Ok(None)` means the service answered with no content.
    ///
    /// # Errors
    ///
    /// Returns any transport or protocol failure.
    fn complete(&self, request: &NameRequest<'_>) -> Result<Option<String>, Error>;
}

/// Wraps a `VisionModel` and reduces every failure to `None`.
pub struct NameGenerator {
    /// Sent with every request.
    instruction: String,
    /// The service doing the looking.
    model: Box<dyn VisionModel>,
}

impl NameGenerator {
    /// Candidate name for the image, trimmed, or `None` if the service
    /// failed or said nothing. The shape of the answer is not checked here.
    pub fn generate(&self, image: &[u8], mime: &str, note_title: &str) -> Option<String> {
        let request = NameRequest {
            image_data_url: data_url(image, mime),
            instruction: &self.instruction,
            note_title,
        };

        let answer = match self.model.complete(&request) {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(error = %e, "vision request failed");
                return None;
            },
        };

        let trimmed = answer.as_deref().map(str::trim).unwrap_or_default();
        if trimmed.is_empty() {
            tracing::warn!("vision service returned no name");
            return None;
        }
        return Some(trimmed.to_string());
    }

    /// Generator that sends `instruction` to `model`.
    pub fn new(model: Box<dyn VisionModel>, instruction: String) -> Self {
        return Self { instruction, model };
    }
}

/// Encode bytes as a base64 data URL.
pub fn data_url(bytes: &[u8], mime: &str) -> String {
    return format!("data:{mime};base64,{}", BASE64.encode(bytes));
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    /// Replays a fixed answer and remembers the last request.
    struct Scripted {
        answer: fn() -> Result<Option<String>, Error>,
        seen: Rc<RefCell<Option<(String, String, String)>>>,
    }

    impl VisionModel for Scripted {
        fn complete(&self, request: &NameRequest<'_>) -> Result<Option<String>, Error> {
            *self.seen.borrow_mut() = Some((
                request.instruction.to_string(),
                request.note_title.to_string(),
                request.image_data_url.clone(),
            ));
            return (self.answer)();
        }
    }

    fn generator(answer: fn() -> Result<Option<String>, Error>) -> (NameGenerator, Rc<RefCell<Option<(String, String, String)>>>) {
        let seen = Rc::new(RefCell::new(None));
        let model = Scripted { answer, seen: Rc::clone(&seen) };
        return (NameGenerator::new(Box::new(model), "name it".to_string()), seen);
    }

    #[test]
    fn trims_the_answer_and_sends_context() {
        let (generator, seen) = generator(|| return Ok(Some("  cat-on-keyboard.png\n".to_string())));
        let name = generator.generate(b"PNG", "image/png", "Daily Log");
        assert_eq!(name.as_deref(), Some("cat-on-keyboard.png"));

        let (instruction, title, url) = seen.borrow().clone().unwrap();
        assert_eq!(instruction, "name it");
        assert_eq!(title, "Daily Log");
        assert_eq!(url, "data:image/png;base64,UE5H");
    }

    #[test]
    fn failures_become_none() {
        let (errored, _) = generator(|| {
            return Err(Error::Inference { reason: "503".to_string() });
        });
        assert!(errored.generate(b"x", "image/png", "t").is_none());

        let (silent, _) = generator(|| return Ok(None));
        assert!(silent.generate(b"x", "image/png", "t").is_none());

        let (blank, _) = generator(|| return Ok(Some(" \n ".to_string())));
        assert!(blank.generate(b"x", "image/png", "t").is_none());
    }

    #[test]
    fn answer_shape_is_not_validated_here() {
        let (generator, _) = generator(|| return Ok(Some("Not A Slug/..png".to_string())));
        assert_eq!(generator.generate(b"x", "image/png", "t").as_deref(), Some("Not A Slug/..png"));
    }
}
