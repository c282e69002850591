//! End-to-end sessions driven through `Game`

use glam::Vec2;

use bubble_quest::consts::{BUBBLE_REMOVAL_DELAY_MS, YEAR_ADVANCE_DELAY_MS};
use bubble_quest::content::{BubbleRecord, ContentLibrary, ContentMode, PhilosophyQuestion, QuestionOption};
use bubble_quest::game::achievements::AchievementId;
use bubble_quest::game::interaction::ClickOutcome;
use bubble_quest::game::modal::Modal;
use bubble_quest::game::progression::PhilosophyAnswer;
use bubble_quest::sim::{BubbleId, SkillLevel};
use bubble_quest::tuning::AchievementXp;
use bubble_quest::{Game, GameError, GameEvent, Settings, Tuning};

fn novice(id: BubbleId) -> BubbleRecord {
    BubbleRecord {
        id,
        name: format!("Bubble {}", id),
        year: Some(2020),
        skill_level: SkillLevel::Novice,
        ..Default::default()
    }
}

fn negative_question() -> PhilosophyQuestion {
    PhilosophyQuestion {
        id: 1,
        question: "Skip the tests?".into(),
        options: vec![
            QuestionOption {
                text: "Sure".into(),
                agreement_level: -1.0,
                lives_lost: 1,
            },
            QuestionOption {
                text: "No".into(),
                agreement_level: 1.0,
                lives_lost: 0,
            },
        ],
    }
}

/// No random extras, no achievement XP: only the rewards under test move XP
fn plain_tuning() -> Tuning {
    Tuning {
        tough_chance: 0.0,
        hidden_bubble_chance: 0.0,
        philosophy_bubbles_per_year: 0,
        achievement_xp: AchievementXp {
            basic: 0,
            intermediate: 0,
            advanced: 0,
            master: 0,
        },
        ..Tuning::default()
    }
}

/// Started game with the welcome modal dismissed and events drained
fn start(bubbles: Vec<BubbleRecord>, questions: Vec<PhilosophyQuestion>, tuning: Tuning) -> Game {
    let content = ContentLibrary::new(bubbles, questions).unwrap();
    let settings = Settings {
        breathing: false,
        ..Settings::default()
    };
    let mut game = Game::new(
        content,
        tuning,
        &settings,
        ContentMode::Career,
        1000.0,
        1000.0,
        2024,
    )
    .unwrap();
    assert_eq!(game.active_modal(), Some(&Modal::Welcome));
    game.close_modal(0.0).unwrap();
    game.drain_events();
    game
}

/// Grid layout so every click lands on exactly one bubble
fn spread(game: &mut Game) {
    for (i, node) in game.scene_mut().sim.nodes_mut().iter_mut().enumerate() {
        node.pos = Vec2::new(
            150.0 + 250.0 * (i % 3) as f32,
            150.0 + 250.0 * (i / 3) as f32,
        );
        node.vel = Vec2::ZERO;
    }
}

fn click(game: &mut Game, id: BubbleId, now: f64) -> ClickOutcome {
    spread(game);
    let pos = game.scene().node(id).unwrap().pos;
    game.handle_click(pos, now)
}

fn close_all(game: &mut Game, now: f64) {
    while game.active_modal().is_some() {
        game.close_modal(now).unwrap();
    }
}

fn opened(events: &[GameEvent]) -> Vec<Modal> {
    events
        .iter()
        .filter_map(|e| match e {
            GameEvent::ModalOpened(m) => Some(m.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn test_novice_xp_paid_on_close() {
    // Stock rewards; only the extra bubble kinds are switched off
    let tuning = Tuning {
        tough_chance: 0.0,
        hidden_bubble_chance: 0.0,
        philosophy_bubbles_per_year: 0,
        ..Tuning::default()
    };
    let reward = tuning.bubble_xp(SkillLevel::Novice);
    assert_eq!(reward, 3);
    let mut game = start(vec![novice(1), novice(2)], vec![], tuning);

    let outcome = click(&mut game, 1, 10.0);
    assert!(matches!(outcome, ClickOutcome::Opened { id: 1, .. }));
    assert_eq!(game.active_modal(), Some(&Modal::BubbleDetail { bubble_id: 1 }));
    assert_eq!(game.session().xp, 0);

    game.close_modal(20.0).unwrap();
    assert_eq!(game.session().xp, reward);
    assert!(game.achievements().is_unlocked(AchievementId::FirstBubble));

    close_all(&mut game, 20.0);
    assert_eq!(game.session().xp, reward);
}

#[test]
fn test_three_negative_answers_end_game() {
    let tuning = Tuning {
        philosophy_bubbles_per_year: 3,
        ..plain_tuning()
    };
    let mut game = start(vec![novice(1)], vec![negative_question()], tuning);
    let philosophy: Vec<BubbleId> = game
        .scene()
        .nodes()
        .iter()
        .filter(|n| n.is_question)
        .map(|n| n.id)
        .collect();
    assert_eq!(philosophy, vec![-1000, -1001, -1002]);

    let mut now = 0.0;
    for (i, id) in philosophy.into_iter().enumerate() {
        now += 1000.0;
        click(&mut game, id, now);
        assert!(matches!(game.active_modal(), Some(Modal::PhilosophyQuestion { .. })));
        game.answer_question(PhilosophyAnswer::Option(0)).unwrap();
        close_all(&mut game, now);
        game.frame(now + BUBBLE_REMOVAL_DELAY_MS);

        let lives = game.session().lives;
        assert_eq!(lives, 2 - i as u32);
        assert_eq!(game.session().game_completed, i == 2);
    }

    // Game over waits for the chain, then shows on the next frame
    assert_eq!(game.active_modal(), Some(&Modal::GameOver));
    assert!(game.drain_events().contains(&GameEvent::GameOver));
    game.close_modal(now).unwrap();

    let xp = game.session().xp;
    assert_eq!(click(&mut game, 1, now + 100.0), ClickOutcome::Ignored);
    assert_eq!(game.session().xp, xp);
}

#[test]
fn test_answer_validated_before_close() {
    let tuning = Tuning {
        philosophy_bubbles_per_year: 1,
        ..plain_tuning()
    };
    let mut game = start(vec![novice(1)], vec![negative_question()], tuning);
    click(&mut game, -1000, 0.0);
    assert!(matches!(
        game.answer_question(PhilosophyAnswer::Option(9)),
        Err(GameError::UnknownOption { index: 9, .. })
    ));
    game.answer_question(PhilosophyAnswer::Custom("It depends".into()))
        .unwrap();
    game.close_modal(0.0).unwrap();
    assert_eq!(game.session().xp, game.tuning().custom_answer_xp);
    assert_eq!(game.session().lives, 3);
}

#[test]
fn test_tough_bubble_threshold() {
    let tuning = Tuning {
        tough_chance: 1.0,
        ..plain_tuning()
    };
    let per_click = tuning.tough_click_xp;
    let mut game = start(vec![novice(1)], vec![], tuning);
    let required = game.interaction().tough.state(1).unwrap().required;

    for i in 1..required {
        let outcome = click(&mut game, 1, i as f64 * 100.0);
        assert!(matches!(outcome, ClickOutcome::ToughHit { clicks, .. } if clicks == i));
        assert!(game.active_modal().is_none());
        assert!(!game.session().has_visited(1));
    }
    assert_eq!(game.session().xp, per_click * (required - 1));

    let outcome = click(&mut game, 1, 5000.0);
    assert!(matches!(outcome, ClickOutcome::Opened { id: 1, cracked: true, .. }));
    assert!(game.session().has_visited(1));
    assert!(game.achievements().is_unlocked(AchievementId::ToughCracker));

    // No completion reward on close
    let xp = game.session().xp;
    game.close_modal(5100.0).unwrap();
    assert_eq!(game.session().xp, xp);
}

#[test]
fn test_hidden_bubble_found() {
    let tuning = Tuning {
        hidden_bubble_chance: 1.0,
        ..plain_tuning()
    };
    let secret = tuning.secret_bubble_xp;
    let mut game = start(vec![novice(1)], vec![], tuning);
    assert!(game.scene().node(-2000).is_some_and(|n| n.is_hidden));

    let outcome = click(&mut game, -2000, 0.0);
    assert!(matches!(outcome, ClickOutcome::HiddenFound { id: -2000, .. }));
    assert!(game.scene().node(-2000).is_none());
    assert!(matches!(
        game.active_modal(),
        Some(Modal::Achievement(a)) if a.id == AchievementId::SecretDiscoverer
    ));
    assert_eq!(game.session().xp, secret);
    assert!(game.drain_events().contains(&GameEvent::BubbleRemoved(-2000)));
}

#[test]
fn test_removal_waits_for_last_modal() {
    let tuning = Tuning {
        achievement_xp: AchievementXp::default(),
        ..plain_tuning()
    };
    let mut game = start(vec![novice(1), novice(2)], vec![], tuning);
    click(&mut game, 1, 0.0);
    game.close_modal(10.0).unwrap();

    // First-bubble achievement is up now; the bubble must stay
    assert!(matches!(game.active_modal(), Some(Modal::Achievement(_))));
    game.frame(1000.0);
    assert!(game.scene().node(1).is_some());

    close_all(&mut game, 1000.0);
    game.drain_events();
    game.frame(1000.0 + BUBBLE_REMOVAL_DELAY_MS);
    assert!(game.scene().node(1).is_none());
    assert!(game.drain_events().contains(&GameEvent::BubbleRemoved(1)));
}

#[test]
fn test_chain_order_with_level_up() {
    let tuning = Tuning {
        level_thresholds: vec![0, 3, 100, 200],
        ..plain_tuning()
    };
    let mut game = start(vec![novice(1)], vec![], tuning);
    click(&mut game, 1, 0.0);
    close_all(&mut game, 10.0);

    let shown = opened(&game.drain_events());
    let labels: Vec<String> = shown
        .iter()
        .map(|m| match m {
            Modal::BubbleDetail { .. } => "detail".to_string(),
            Modal::Achievement(a) => format!("{:?}", a.id),
            Modal::LevelUp(l) => format!("level {}", l.new_level),
            other => format!("{:?}", other),
        })
        .collect();
    assert_eq!(labels, vec!["detail", "FirstBubble", "FirstLevelUp", "level 2"]);
}

#[test]
fn test_bonus_interrupts_level_up() {
    let tuning = Tuning {
        level_thresholds: vec![0, 1, 3],
        ..plain_tuning()
    };
    let mut game = start(vec![novice(1)], vec![], tuning);
    click(&mut game, 1, 0.0);
    while !matches!(game.active_modal(), Some(Modal::LevelUp(_))) {
        game.close_modal(10.0).unwrap();
    }
    assert!(matches!(game.active_modal(), Some(Modal::LevelUp(l)) if l.new_level == 3));

    game.open_bonus(3).unwrap();
    assert!(matches!(game.active_modal(), Some(Modal::Bonus(b)) if b.level == 3));
    assert!(game.open_bonus(3).is_err());

    // Level-up was already seen; nothing is left after the bonus
    game.close_modal(20.0).unwrap();
    assert_eq!(game.active_modal(), None);
}

#[test]
fn test_empty_click_only_explodes() {
    let mut game = start(vec![novice(1)], vec![], plain_tuning());
    spread(&mut game);
    let outcome = game.handle_click(Vec2::new(900.0, 900.0), 0.0);
    assert!(matches!(outcome, ClickOutcome::EmptyExplosion { .. }));
    assert_eq!(game.session().xp, 0);
    assert!(game.active_modal().is_none());
}

#[test]
fn test_project_mode_shows_every_year() {
    let mut bubbles = vec![novice(1)];
    bubbles.push(BubbleRecord {
        year: Some(2021),
        ..novice(2)
    });
    let content = ContentLibrary::new(bubbles, vec![]).unwrap();
    let game = Game::new(
        content,
        plain_tuning(),
        &Settings::default(),
        ContentMode::Project,
        800.0,
        600.0,
        3,
    )
    .unwrap();
    assert_eq!(game.scene().nodes().len(), 2);
}

#[test]
fn test_second_secret_shows_no_second_achievement() {
    let tuning = Tuning {
        hidden_bubble_chance: 1.0,
        ..plain_tuning()
    };
    let secret = tuning.secret_bubble_xp;
    let mut bubbles = vec![novice(1)];
    bubbles.push(BubbleRecord {
        year: Some(2021),
        ..novice(2)
    });
    let mut game = start(bubbles, vec![], tuning);

    assert!(matches!(click(&mut game, -2000, 0.0), ClickOutcome::HiddenFound { .. }));
    close_all(&mut game, 0.0);

    // Clear the year so the next one brings a fresh hidden bubble
    click(&mut game, 1, 100.0);
    close_all(&mut game, 100.0);
    game.frame(100.0 + BUBBLE_REMOVAL_DELAY_MS);
    game.frame(100.0 + BUBBLE_REMOVAL_DELAY_MS + YEAR_ADVANCE_DELAY_MS);
    assert_eq!(game.session().current_year, Some(2021));
    close_all(&mut game, 500.0);

    assert!(matches!(
        click(&mut game, -2001, 600.0),
        ClickOutcome::HiddenFound { id: -2001, .. }
    ));
    assert!(game.active_modal().is_none());
    assert_eq!(game.session().xp, secret * 2);

    let secret_modals = opened(&game.drain_events())
        .into_iter()
        .filter(|m| matches!(m, Modal::Achievement(a) if a.id == AchievementId::SecretDiscoverer))
        .count();
    assert_eq!(secret_modals, 1);
}
