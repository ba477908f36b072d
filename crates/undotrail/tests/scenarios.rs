#![forbid(unsafe_code)]

//! Scenario suite for the undo manager.
//!
//! Every model-driven scenario runs once with direct actions and once with
//! path-dereferenced actions; both must produce the same model states.
//!
//! 1. `single_mutation` – undo/redo of one scalar set, append, removal
//! 2. `modes` – once, merge and ignore recording
//! 3. `moves` – delete+add coalescing
//! 4. `bounds` – level eviction and command bindings
//! 5. `replay_order` – step order of combined actions
//! 6. `dereference` – resolution against a replaced container

use std::cell::RefCell;
use std::rc::Rc;

use undotrail::{
    InverseAction, MergeRule, RecordingMode, ReplayOrder, UndoError, UndoManager, UndoOptions,
};
use undotrail_reactive::{Node, ObservableArray, ObservableCell, PlainValue, Record};

fn for_each_strategy(scenario: impl Fn(bool)) {
    for dereference in [false, true] {
        scenario(dereference);
    }
}

fn options(dereference: bool) -> UndoOptions {
    UndoOptions::default().with_dereference(dereference)
}

fn texts(items: &[&str]) -> PlainValue {
    PlainValue::List(items.iter().map(|s| PlainValue::from(*s)).collect())
}

struct Doc {
    root: Node,
    title: ObservableCell,
    list: ObservableArray,
}

fn doc() -> Doc {
    let title = ObservableCell::new("draft");
    let list = ObservableArray::from_iter(["a", "b", "c"]);
    let root = Node::from(
        Record::new()
            .with("title", title.clone())
            .with("list", list.clone()),
    );
    Doc { root, title, list }
}

mod single_mutation {
    use super::*;

    #[test]
    fn set_scalar_undo_redo() {
        for_each_strategy(|deref| {
            let d = doc();
            let m = UndoManager::new(&d.root, options(deref)).unwrap();
            d.title.set("final");
            let before_undo = d.root.to_plain();

            assert!(m.undo().unwrap());
            assert_eq!(d.title.get().to_plain(), PlainValue::from("draft"));
            assert!(m.redo().unwrap());
            assert_eq!(d.root.to_plain(), before_undo);
            assert_eq!((m.undo_len(), m.redo_len()), (1, 0));
        });
    }

    #[test]
    fn append_undo_redo() {
        for_each_strategy(|deref| {
            let d = doc();
            let m = UndoManager::new(&d.root, options(deref)).unwrap();
            d.list.push("d");
            let before_undo = d.root.to_plain();

            m.undo().unwrap();
            assert_eq!(Node::from(d.list.clone()).to_plain(), texts(&["a", "b", "c"]));
            m.redo().unwrap();
            assert_eq!(d.root.to_plain(), before_undo);
        });
    }

    #[test]
    fn remove_then_undo_restores_position() {
        for_each_strategy(|deref| {
            let d = doc();
            let m = UndoManager::new(&d.root, options(deref)).unwrap();
            d.list.remove(1).unwrap();
            assert_eq!(Node::from(d.list.clone()).to_plain(), texts(&["a", "c"]));

            m.undo().unwrap();
            assert_eq!(Node::from(d.list.clone()).to_plain(), texts(&["a", "b", "c"]));
            assert_eq!(d.list.get(1).unwrap().to_plain(), PlainValue::from("b"));

            m.redo().unwrap();
            assert_eq!(Node::from(d.list.clone()).to_plain(), texts(&["a", "c"]));
        });
    }

    #[test]
    fn undo_redo_cycles_are_stable() {
        for_each_strategy(|deref| {
            let d = doc();
            let m = UndoManager::new(&d.root, options(deref)).unwrap();
            d.title.set("one");
            d.list.push("d");
            let done = d.root.to_plain();

            for _ in 0..3 {
                m.undo().unwrap();
                m.undo().unwrap();
                m.redo().unwrap();
                m.redo().unwrap();
                assert_eq!(d.root.to_plain(), done);
                assert_eq!((m.undo_len(), m.redo_len()), (2, 0));
            }
        });
    }
}

mod modes {
    use super::*;

    #[test]
    fn once_keeps_first_old_value() {
        for_each_strategy(|deref| {
            let d = doc();
            let m = UndoManager::new(&d.root, options(deref)).unwrap();
            m.set_mode_once();
            for value in ["v1", "v2", "v3", "v4"] {
                d.title.set(value);
            }
            assert_eq!(m.undo_len(), 1);

            m.undo().unwrap();
            assert_eq!(d.title.get().to_plain(), PlainValue::from("draft"));
        });
    }

    #[test]
    fn once_does_not_swallow_other_fields() {
        let d = doc();
        let subtitle = ObservableCell::new("s");
        let root = Node::from(
            Record::new()
                .with("title", d.title.clone())
                .with("subtitle", subtitle.clone()),
        );
        let m = UndoManager::new(&root, UndoOptions::default()).unwrap();
        m.set_mode_once();
        d.title.set("t2");
        subtitle.set("s2");
        d.title.set("t3");
        assert_eq!(m.undo_len(), 3);
    }

    #[test]
    fn merge_reverses_whole_burst() {
        for_each_strategy(|deref| {
            let d = doc();
            let m = UndoManager::new(&d.root, options(deref)).unwrap();
            let before = d.root.to_plain();
            m.set_mode_merge();
            d.title.set("x");
            d.title.set("y");
            d.list.push("d");
            d.list.remove(0).unwrap();
            d.list.splice(0, 1, vec![Node::from("q"), Node::from("r")]).unwrap();
            let after = d.root.to_plain();
            assert_eq!(m.undo_len(), 1);

            m.undo().unwrap();
            assert_eq!(d.root.to_plain(), before);
            assert_eq!(m.redo_len(), 1);

            m.redo().unwrap();
            assert_eq!(d.root.to_plain(), after);
            assert_eq!(m.undo_len(), 1);
        });
    }

    #[test]
    fn burst_does_not_absorb_earlier_history() {
        let d = doc();
        let m = UndoManager::new(&d.root, UndoOptions::default()).unwrap();
        d.title.set("normal");
        m.set_mode_merge();
        d.title.set("m1");
        d.title.set("m2");
        assert_eq!(m.undo_len(), 2);
        m.set_mode_normal();
        d.title.set("after");
        assert_eq!(m.undo_len(), 3);

        m.undo().unwrap();
        m.undo().unwrap();
        assert_eq!(d.title.get().to_plain(), PlainValue::from("normal"));
    }

    #[test]
    fn ignore_leaves_history_untouched() {
        let d = doc();
        let m = UndoManager::new(&d.root, UndoOptions::default()).unwrap();
        d.title.set("kept");
        m.set_mode(RecordingMode::Ignore);
        d.title.set("ignored");
        d.list.push("ignored");
        assert_eq!(m.undo_len(), 1);
        assert_eq!(m.mode(), RecordingMode::Ignore);
    }
}

mod moves {
    use super::*;

    #[test]
    fn move_between_arrays_is_one_step() {
        for_each_strategy(|deref| {
            let item = Record::new().with("name", ObservableCell::new("task"));
            let todo = ObservableArray::with_items(vec![
                Node::from("first"),
                Node::from(item.clone()),
                Node::from("last"),
            ]);
            let done = ObservableArray::from_iter(["old"]);
            let root = Node::from(
                Record::new()
                    .with("todo", todo.clone())
                    .with("done", done.clone()),
            );
            let m = UndoManager::new(&root, options(deref)).unwrap();
            let before = root.to_plain();

            let moved = todo.remove(1).unwrap();
            done.insert(0, moved).unwrap();
            let after = root.to_plain();
            assert_eq!(m.undo_len(), 1);

            m.undo().unwrap();
            assert_eq!(root.to_plain(), before);
            assert!(todo.get(1).unwrap().same(&Node::from(item.clone())));
            assert_eq!(done.len(), 1);

            m.redo().unwrap();
            assert_eq!(root.to_plain(), after);
            assert_eq!(m.undo_len(), 1);
        });
    }

    #[test]
    fn move_within_array_is_one_step() {
        for_each_strategy(|deref| {
            let d = doc();
            let m = UndoManager::new(&d.root, options(deref)).unwrap();
            let a = d.list.remove(0).unwrap();
            d.list.insert(2, a).unwrap();
            assert_eq!(Node::from(d.list.clone()).to_plain(), texts(&["b", "c", "a"]));
            assert_eq!(m.undo_len(), 1);

            m.undo().unwrap();
            assert_eq!(Node::from(d.list.clone()).to_plain(), texts(&["a", "b", "c"]));
        });
    }

    #[test]
    fn unrelated_add_does_not_coalesce() {
        let d = doc();
        let m = UndoManager::new(&d.root, UndoOptions::default()).unwrap();
        d.list.remove(0).unwrap();
        d.list.push("z");
        assert_eq!(m.undo_len(), 2);
    }

    #[test]
    fn add_before_delete_does_not_coalesce() {
        let d = doc();
        let m = UndoManager::new(&d.root, UndoOptions::default()).unwrap();
        d.list.push("a");
        d.list.remove(0).unwrap();
        assert_eq!(m.undo_len(), 2);
    }
}

mod bounds {
    use super::*;

    fn recorder(log: &Rc<RefCell<Vec<&'static str>>>, name: &'static str) -> InverseAction {
        let log = Rc::clone(log);
        InverseAction::new(name, move || {
            log.borrow_mut().push(name);
            Ok(())
        })
    }

    #[test]
    fn levels_evict_oldest() {
        let root = Node::from(Record::new());
        let m = UndoManager::new(&root, UndoOptions::default().with_levels(2)).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        for name in ["A", "B", "C"] {
            m.push(recorder(&log, name));
        }
        assert_eq!(m.undo_descriptions(10), vec!["C", "B"]);

        assert_eq!(m.undo(), Ok(true));
        assert_eq!(m.undo(), Ok(true));
        assert_eq!(m.undo(), Ok(false));
        assert_eq!(*log.borrow(), vec!["C", "B"]);
    }

    #[test]
    fn model_history_never_exceeds_levels() {
        let d = doc();
        let m = UndoManager::new(&d.root, UndoOptions::default().with_levels(3)).unwrap();
        for i in 0..10 {
            d.title.set(format!("t{i}"));
            assert!(m.undo_len() <= 3);
        }
        for _ in 0..3 {
            m.undo().unwrap();
        }
        assert_eq!(d.title.get().to_plain(), PlainValue::from("t6"));
        assert!(!m.can_undo());
    }

    #[test]
    fn enabled_tracks_emptiness() {
        let d = doc();
        let m = UndoManager::new(&d.root, UndoOptions::default()).unwrap();
        let undo = m.undo_command();
        assert!(!undo.enabled());
        d.title.set("1");
        d.title.set("2");
        d.title.set("3");
        assert_eq!(undo.label(), "undo (3)");
        assert!(undo.enabled());
        while undo.execute().unwrap() {}
        assert!(!undo.enabled());
        assert_eq!(m.redo_command().label(), "redo (3)");
    }

    #[test]
    fn failing_action_propagates() {
        let root = Node::from(Record::new());
        let m = UndoManager::new(&root, UndoOptions::default()).unwrap();
        m.push(InverseAction::new("bad", || Err(UndoError::action("gone"))));
        assert_eq!(m.undo(), Err(UndoError::action("gone")));
        assert!(!m.can_undo());
        assert!(!m.can_redo());
    }
}

mod replay_order {
    use super::*;

    fn burst(log: &Rc<RefCell<Vec<&'static str>>>, name: &'static str) -> InverseAction {
        let log = Rc::clone(log);
        InverseAction::new(name, move || {
            log.borrow_mut().push(name);
            Ok(())
        })
        .with_merge_rule(MergeRule::Burst)
        .with_merge_flag(true)
    }

    fn replayed(order: ReplayOrder) -> Vec<&'static str> {
        let root = Node::from(Record::new());
        let m = UndoManager::new(&root, UndoOptions::default().with_replay_order(order)).unwrap();
        let log = Rc::new(RefCell::new(Vec::new()));
        for name in ["first", "second", "third"] {
            m.push(burst(&log, name));
        }
        assert_eq!(m.undo_len(), 1);
        m.undo().unwrap();
        log.take()
    }

    #[test]
    fn newest_first_by_default() {
        assert_eq!(replayed(ReplayOrder::default()), vec!["third", "second", "first"]);
    }

    #[test]
    fn capture_order_runs_first_recorded_first() {
        assert_eq!(replayed(ReplayOrder::CaptureOrder), vec!["first", "second", "third"]);
    }
}

mod dereference {
    use super::*;

    #[test]
    fn resolves_replacement_container() {
        let original = ObservableArray::from_iter(["a", "b"]);
        let slot = ObservableCell::new(original.clone());
        let root = Node::from(Record::new().with("slot", slot.clone()));
        let m = UndoManager::new(&root, options(true)).unwrap();

        original.push("c");
        m.set_mode_ignore();
        let replacement = ObservableArray::from_iter(["a", "b", "c"]);
        slot.set(replacement.clone());
        m.set_mode_normal();

        m.undo().unwrap();
        assert_eq!(Node::from(replacement).to_plain(), texts(&["a", "b"]));
        assert_eq!(Node::from(original).to_plain(), texts(&["a", "b", "c"]));
    }

    #[test]
    fn unresolvable_path_is_an_error() {
        let list = ObservableArray::from_iter(["a"]);
        let slot = ObservableCell::new(Record::new().with("list", list.clone()));
        let root = Node::from(Record::new().with("slot", slot.clone()));
        let m = UndoManager::new(&root, options(true)).unwrap();

        list.push("b");
        m.set_mode_ignore();
        slot.set(Node::null());
        m.set_mode_normal();

        assert!(matches!(m.undo(), Err(UndoError::Path(_))));
        assert!(!m.can_undo());
    }

    #[test]
    fn strategy_switch_at_runtime() {
        let d = doc();
        let m = UndoManager::new(&d.root, UndoOptions::default()).unwrap();
        assert!(!m.dereference());
        d.title.set("direct");
        m.set_dereference(true);
        d.title.set("path");
        assert_eq!(m.undo_descriptions(2), vec!["restore .title", "restore .title"]);
        m.undo().unwrap();
        m.undo().unwrap();
        assert_eq!(d.title.get().to_plain(), PlainValue::from("draft"));
    }
}
