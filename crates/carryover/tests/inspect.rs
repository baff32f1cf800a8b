mod common;

use carryover::inspect::{CardListing, TemplateListing};
use carryover::{Engine, Error};
use common::*;

#[test]
fn test_list_templates() {
    let engine = Engine::new(CollectionBuilder::split().domino().build());

    let templates = engine.inspect().templates().unwrap();
    let names: Vec<_> = templates
        .iter()
        .map(|t| (t.note_type_id, t.template.as_str(), t.ord))
        .collect();
    assert_eq!(
        names,
        vec![
            (SOURCE_MID, "Recall", 0),
            (TARGET_MID, "Stroke Order", 0),
            (TARGET_MID, "Recall", 1),
        ]
    );
    assert_eq!(
        templates[2],
        TemplateListing {
            note_type_id: TARGET_MID,
            note_type: TARGET_TYPE.to_string(),
            template: "Recall".to_string(),
            ord: 1,
        }
    );
}

#[test]
fn test_list_cards_of_note_type() {
    let engine = Engine::new(domino_collection(CollectionBuilder::legacy()));

    let cards = engine.inspect().cards(TARGET_TYPE).unwrap();
    assert_eq!(cards.len(), 4);
    assert_eq!(
        cards[0],
        CardListing {
            card_id: 2101,
            ord: 1,
            template: Some("Recall".to_string()),
            due: 3,
        }
    );
    assert_eq!(cards[2].template.as_deref(), Some("Stroke Order"));

    assert!(engine.inspect().cards("Missing").unwrap().is_empty());
}

#[test]
fn test_card_due() {
    let engine = Engine::new(domino_collection(CollectionBuilder::legacy()));

    assert_eq!(engine.inspect().card_due(1101).unwrap(), 5);
    assert_eq!(engine.inspect().card_due(2202).unwrap(), 41);
    assert!(matches!(
        engine.inspect().card_due(4242),
        Err(Error::CardNotFound(4242))
    ));
}

#[test]
fn test_card_due_follows_transfer() {
    let mut engine = Engine::new(domino_collection(CollectionBuilder::legacy()));
    let job = carryover::transfer::TransferJob::new(
        "Hanzi",
        carryover::resolve::TemplateSpec::new(SOURCE_TYPE, "Recall"),
        carryover::resolve::TemplateSpec::new(TARGET_TYPE, "Recall"),
    );
    engine.transfer().run(&job).unwrap();

    let cards = engine.inspect().cards(TARGET_TYPE).unwrap();
    let merged = cards.iter().find(|c| c.card_id == 1101).unwrap();
    assert_eq!(merged.template.as_deref(), Some("Recall"));
    assert_eq!(merged.due, 5);
    assert_eq!(engine.inspect().card_due(1101).unwrap(), 5);
}
