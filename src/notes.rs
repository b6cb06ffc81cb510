//! User-owned study records carrying citations.
//!
//! Notes, study kits, flashcards, and quiz questions are sinks for
//! retrieval output: they embed [`Citation`] values but play no part in
//! ranking. They persist as opaque JSON in the store's `notes` collection,
//! keyed by their id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::ObjectStore;
use uuid::Uuid;

use crate::engine::Citation;
use crate::error::EngineError;

/// A free-form note with supporting citations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub body: String,
    pub citations: Vec<Citation>,
    pub created_at: DateTime<Utc>,
}

impl Note {
    pub fn new(title: impl Into<String>, body: impl Into<String>, citations: Vec<Citation>) -> Self {
        Self {
            id: format!("note-{}", Uuid::new_v4().simple()),
            title: title.into(),
            body: body.into(),
            citations,
            created_at: Utc::now(),
        }
    }
}

/// One question/answer pair for review.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Flashcard {
    pub front: String,
    pub back: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<Citation>,
}

/// A multiple-choice question with the source passage it was drawn from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizQuestion {
    pub prompt: String,
    pub choices: Vec<String>,
    pub answer_index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub citation: Option<Citation>,
}

/// A bundle of study material generated from retrieval output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudyKit {
    pub id: String,
    pub title: String,
    pub flashcards: Vec<Flashcard>,
    pub quiz: Vec<QuizQuestion>,
    pub created_at: DateTime<Utc>,
}

impl StudyKit {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: format!("kit-{}", Uuid::new_v4().simple()),
            title: title.into(),
            flashcards: Vec::new(),
            quiz: Vec::new(),
            created_at: Utc::now(),
        }
    }
}

/// Persist a record into the notes collection under its id.
pub fn save_record<T: Serialize>(
    store: &ObjectStore,
    id: &str,
    record: &T,
) -> Result<(), EngineError> {
    let value = serde_json::to_value(record)
        .map_err(|e| EngineError::Input(format!("unserializable record: {e}")))?;
    store.put_note_json(id, &value)?;
    Ok(())
}

/// Load a record from the notes collection.
pub fn load_record<T: for<'de> Deserialize<'de>>(
    store: &ObjectStore,
    id: &str,
) -> Result<Option<T>, EngineError> {
    match store.get_note_json(id)? {
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| EngineError::Consistency(format!("corrupt note record {id}: {e}"))),
        None => Ok(None),
    }
}

impl Note {
    pub fn save(&self, store: &ObjectStore) -> Result<(), EngineError> {
        save_record(store, &self.id, self)
    }

    pub fn load(store: &ObjectStore, id: &str) -> Result<Option<Note>, EngineError> {
        load_record(store, id)
    }
}

impl StudyKit {
    pub fn save(&self, store: &ObjectStore) -> Result<(), EngineError> {
        save_record(store, &self.id, self)
    }

    pub fn load(store: &ObjectStore, id: &str) -> Result<Option<StudyKit>, EngineError> {
        load_record(store, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citation() -> Citation {
        Citation {
            chunk_id: "d1-chunk-0".into(),
            doc_id: "d1".into(),
            doc_name: "paper.pdf".into(),
            page_number: 3,
            text: "the cited passage".into(),
            score: Some(0.8),
        }
    }

    #[test]
    fn note_roundtrips_through_the_store() {
        let store = ObjectStore::in_memory().unwrap();
        let note = Note::new("BM25", "idf saturates with k1", vec![citation()]);
        note.save(&store).unwrap();

        let loaded = Note::load(&store, &note.id).unwrap().unwrap();
        assert_eq!(loaded, note);
        assert_eq!(loaded.citations[0].page_number, 3);
    }

    #[test]
    fn study_kit_roundtrips_with_cards_and_quiz() {
        let store = ObjectStore::in_memory().unwrap();
        let mut kit = StudyKit::new("Retrieval basics");
        kit.flashcards.push(Flashcard {
            front: "What does BM25 rank by?".into(),
            back: "Term frequency saturated by k1, scaled by idf".into(),
            citation: Some(citation()),
        });
        kit.quiz.push(QuizQuestion {
            prompt: "Which mode needs no embeddings?".into(),
            choices: vec!["lexical".into(), "semantic".into(), "hybrid".into()],
            answer_index: 0,
            citation: None,
        });
        kit.save(&store).unwrap();

        let loaded = StudyKit::load(&store, &kit.id).unwrap().unwrap();
        assert_eq!(loaded, kit);
    }

    #[test]
    fn missing_record_loads_as_none() {
        let store = ObjectStore::in_memory().unwrap();
        assert!(Note::load(&store, "note-ghost").unwrap().is_none());
    }
}
