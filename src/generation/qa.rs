use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::config::{GenerationConfig, QaConfig};
use crate::generation::chunker::chunk_words;
use crate::generation::difficulty::score_difficulty;
use crate::generation::questions::propose_questions;
use crate::models::FlashcardDraft;
use crate::qa_client::{QaError, QuestionAnswerer};

/// What a QA-backed generation attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QaOutcome {
    Generated(Vec<FlashcardDraft>),
    /// Nothing reached the service, or the overall deadline passed.
    ServiceUnavailable,
    NoUsableAnswers,
}

#[derive(Clone)]
pub struct QaGenerator {
    client: Arc<dyn QuestionAnswerer>,
    qa: QaConfig,
    generation: GenerationConfig,
}

struct Attempt {
    question: &'static str,
    result: Result<String, QaError>,
}

impl QaGenerator {
    pub fn new(
        client: Arc<dyn QuestionAnswerer>,
        qa: QaConfig,
        generation: GenerationConfig,
    ) -> Self {
        Self {
            client,
            qa,
            generation,
        }
    }

    pub async fn generate(&self, text: &str) -> QaOutcome {
        match tokio::time::timeout(self.qa.overall_timeout, self.collect(text)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(
                    "qa generation exceeded overall deadline of {:?}",
                    self.qa.overall_timeout
                );
                QaOutcome::ServiceUnavailable
            }
        }
    }

    async fn collect(&self, text: &str) -> QaOutcome {
        let pairs: Vec<(String, &'static str)> = chunk_words(text, self.generation.chunk_max_length)
            .take(self.generation.max_chunks)
            .flat_map(|chunk| {
                propose_questions(&chunk)
                    .into_iter()
                    .take(self.generation.questions_per_chunk)
                    .map(move |question| (chunk.clone(), question))
                    .collect::<Vec<_>>()
            })
            .collect();

        if pairs.is_empty() {
            return QaOutcome::NoUsableAnswers;
        }

        let issued = pairs.len();
        let requests: Vec<_> = pairs
            .into_iter()
            .map(|(chunk, question)| {
                let client = self.client.clone();
                async move {
                    let result = client.answer(question, &chunk).await;
                    Attempt { question, result }
                }
            })
            .collect();

        // `buffered` yields in submission order, so drafts keep chunk/question order.
        let mut attempts = stream::iter(requests).buffered(self.qa.concurrency.max(1));

        let mut drafts = Vec::new();
        let mut transport_failures = 0usize;
        while let Some(attempt) = attempts.next().await {
            let answer = match attempt.result {
                Ok(answer) => answer,
                Err(err) => {
                    if err.is_transport() {
                        transport_failures += 1;
                    }
                    tracing::warn!("qa request skipped: {}", err);
                    continue;
                }
            };

            let answer = answer.trim();
            if answer.chars().count() <= self.generation.min_answer_chars {
                tracing::debug!("qa answer too short, skipping: {:?}", answer);
                continue;
            }

            drafts.push(FlashcardDraft {
                title: format!("Concept {}", drafts.len() + 1),
                question: attempt.question.to_string(),
                answer: answer.to_string(),
                difficulty: score_difficulty(attempt.question, answer),
            });

            if drafts.len() >= self.generation.max_drafts {
                break;
            }
        }

        if !drafts.is_empty() {
            QaOutcome::Generated(drafts)
        } else if transport_failures == issued {
            QaOutcome::ServiceUnavailable
        } else {
            QaOutcome::NoUsableAnswers
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use reqwest::StatusCode;

    use super::*;
    use crate::models::Difficulty;

    const TEXT: &str = "Photosynthesis is the process plants use to turn light into sugar. \
                        Chlorophyll absorbs light energy in the leaves of green plants.";

    struct Echo {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QuestionAnswerer for Echo {
        async fn answer(&self, question: &str, _context: &str) -> Result<String, QaError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("  answer number {n} for {question}  "))
        }
    }

    struct Short;

    #[async_trait]
    impl QuestionAnswerer for Short {
        async fn answer(&self, _question: &str, _context: &str) -> Result<String, QaError> {
            Ok("sugar".to_string())
        }
    }

    struct Rejecting;

    #[async_trait]
    impl QuestionAnswerer for Rejecting {
        async fn answer(&self, _question: &str, _context: &str) -> Result<String, QaError> {
            Err(QaError::Status {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: "loading".to_string(),
            })
        }
    }

    struct Stalled;

    #[async_trait]
    impl QuestionAnswerer for Stalled {
        async fn answer(&self, _question: &str, _context: &str) -> Result<String, QaError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("never returned in time".to_string())
        }
    }

    async fn transport_error() -> QaError {
        let err = reqwest::Client::new()
            .get("http://127.0.0.1:0/")
            .send()
            .await
            .expect_err("port zero is never reachable");
        QaError::Transport(err)
    }

    struct Unreachable;

    #[async_trait]
    impl QuestionAnswerer for Unreachable {
        async fn answer(&self, _question: &str, _context: &str) -> Result<String, QaError> {
            Err(transport_error().await)
        }
    }

    /// Alternates between a dropped connection and a 503.
    struct Flaky {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QuestionAnswerer for Flaky {
        async fn answer(&self, _question: &str, _context: &str) -> Result<String, QaError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) % 2 == 0 {
                Err(transport_error().await)
            } else {
                Err(QaError::Status {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    body: "loading".to_string(),
                })
            }
        }
    }

    const WORDS: [&str; 5] = ["alpha", "bravo", "charlie", "delta", "echo"];

    /// Answers about later words come back first.
    struct Staggered;

    #[async_trait]
    impl QuestionAnswerer for Staggered {
        async fn answer(&self, _question: &str, context: &str) -> Result<String, QaError> {
            let position = WORDS.iter().position(|w| *w == context).unwrap_or(0);
            let delay = (WORDS.len() - position) as u64 * 100;
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(format!("the answer drawn from {context}"))
        }
    }

    fn generator(client: Arc<dyn QuestionAnswerer>) -> QaGenerator {
        QaGenerator::new(client, QaConfig::default(), GenerationConfig::default())
    }

    #[tokio::test]
    async fn usable_answers_become_numbered_concepts() {
        let outcome = generator(Arc::new(Echo {
            calls: AtomicUsize::new(0),
        }))
        .generate(TEXT)
        .await;

        let QaOutcome::Generated(drafts) = outcome else {
            panic!("expected drafts, got {outcome:?}");
        };
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].title, "Concept 1");
        assert_eq!(drafts[1].title, "Concept 2");
        // "process" pulls the steps question to the front.
        assert_eq!(drafts[0].question, "What process or steps are described here?");
        assert_eq!(
            drafts[0].answer,
            "answer number 0 for What process or steps are described here?"
        );
        assert_eq!(drafts[0].difficulty, Difficulty::Medium);
    }

    #[tokio::test]
    async fn draft_cap_limits_requests() {
        let text = (0..40)
            .map(|n| format!("Paragraph {n} {}", "filler ".repeat(20)))
            .collect::<Vec<_>>()
            .join(" ");
        let echo = Arc::new(Echo {
            calls: AtomicUsize::new(0),
        });
        let outcome = generator(echo.clone()).generate(&text).await;

        let QaOutcome::Generated(drafts) = outcome else {
            panic!("expected drafts");
        };
        assert_eq!(drafts.len(), 5);
        assert_eq!(echo.calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn short_answers_are_not_usable() {
        assert_eq!(
            generator(Arc::new(Short)).generate(TEXT).await,
            QaOutcome::NoUsableAnswers
        );
    }

    #[tokio::test]
    async fn status_errors_are_not_unavailability() {
        assert_eq!(
            generator(Arc::new(Rejecting)).generate(TEXT).await,
            QaOutcome::NoUsableAnswers
        );
    }

    #[tokio::test]
    async fn all_transport_failures_are_unavailability() {
        assert_eq!(
            generator(Arc::new(Unreachable)).generate(TEXT).await,
            QaOutcome::ServiceUnavailable
        );
    }

    #[tokio::test]
    async fn mixed_failures_are_not_unavailability() {
        let flaky = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
        });
        assert_eq!(
            generator(flaky.clone()).generate(TEXT).await,
            QaOutcome::NoUsableAnswers
        );
        assert!(flaky.calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_answers_keep_submission_order() {
        let qa = QaConfig {
            concurrency: 8,
            ..QaConfig::default()
        };
        let generation = GenerationConfig {
            max_drafts: 10,
            chunk_max_length: 1,
            ..GenerationConfig::default()
        };
        let generator = QaGenerator::new(Arc::new(Staggered), qa, generation);

        let QaOutcome::Generated(drafts) = generator.generate(&WORDS.join(" ")).await else {
            panic!("expected drafts");
        };
        assert_eq!(drafts.len(), 10);
        for (n, draft) in drafts.iter().enumerate() {
            assert_eq!(draft.title, format!("Concept {}", n + 1));
            assert_eq!(draft.answer, format!("the answer drawn from {}", WORDS[n / 2]));
        }
    }

    #[test]
    fn generation_future_is_send() {
        fn assert_send<T: Send>(_: T) {}
        let generator = generator(Arc::new(Short));
        assert_send(generator.generate(TEXT));
    }

    #[tokio::test]
    async fn empty_text_issues_no_requests() {
        assert_eq!(
            generator(Arc::new(Short)).generate("   ").await,
            QaOutcome::NoUsableAnswers
        );
    }

    #[tokio::test(start_paused = true)]
    async fn overall_deadline_reports_unavailable() {
        let qa = QaConfig {
            overall_timeout: Duration::from_secs(5),
            ..QaConfig::default()
        };
        let generator = QaGenerator::new(Arc::new(Stalled), qa, GenerationConfig::default());
        assert_eq!(generator.generate(TEXT).await, QaOutcome::ServiceUnavailable);
    }
}
