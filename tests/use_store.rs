use std::{cell::RefCell, rc::Rc};

use bindhook::{
    create_use, use_run_once_on_change, Component, Identifier, Listener, Path, PathStore,
    Runtime, SetOptions, Setter, Store, StoreError, Teardown, Unsubscribe, UseOptions, UseStore,
    Value, WriteMeta,
};
use serde_json::json;

/// A PathStore that logs every operation the hook performs on it.
#[derive(Clone, Default)]
struct LoggingStore {
    inner: PathStore,
    log: Rc<RefCell<Vec<String>>>,
}

impl LoggingStore {
    fn take_log(&self) -> Vec<String> {
        self.log.take()
    }

    fn record(&self, op: &str, path: &Path) {
        self.log.borrow_mut().push(format!("{op} {path}"));
    }
}

impl Store for LoggingStore {
    type Path = Path;
    type Value = Value;
    type Error = StoreError;

    fn get(&self, path: &Path) -> Result<Option<Value>, StoreError> {
        self.record("get", path);
        Store::get(&self.inner, path)
    }

    fn set(&self, path: &Path, value: Option<Value>, meta: WriteMeta) -> Result<(), StoreError> {
        self.record("set", path);
        Store::set(&self.inner, path, value, meta)
    }

    fn subscribe(
        &self,
        path: &Path,
        listener: Listener<StoreError>,
    ) -> Result<Unsubscribe, StoreError> {
        self.record("subscribe", path);
        let unsubscribe = Store::subscribe(&self.inner, path, listener)?;
        let this = self.clone();
        let path = path.clone();
        Ok(Unsubscribe::new(move || {
            this.record("unsubscribe", &path);
            unsubscribe.call();
        }))
    }
}

type Bound<S> = (Option<Value>, Setter<S>);

fn mount<S>(
    use_store: &UseStore<S>,
    path: &str,
    default: Option<Value>,
    options: UseOptions,
) -> Component<Path, Bound<S>>
where
    S: Store<Path = Path, Value = Value>,
{
    let use_store = use_store.clone();
    Component::mount(path.parse().unwrap(), move |hooks, path: &Path| {
        let bound = use_store.use_path(hooks, path.clone(), default.clone(), &options)?;
        Ok(bound)
    })
    .unwrap()
}

fn value<S: Store>(component: &Component<Path, Bound<S>>) -> Option<Value> {
    component.with_output(|output| output.and_then(|(value, _)| value.clone()))
}

fn setter<S: Store>(component: &Component<Path, Bound<S>>) -> Setter<S> {
    component.with_output(|output| output.unwrap().1.clone())
}

fn path(path: &str) -> Path {
    path.parse().unwrap()
}

fn settle() {
    Runtime::drain_pending_work().unwrap();
}

#[test]
fn rerender_with_same_path_does_not_touch_the_store() {
    let store = LoggingStore::default();
    let component = mount(&create_use(store.clone()), "a", Some(json!(1)), UseOptions::new());
    assert_eq!(store.take_log(), ["get a", "set a", "subscribe a"]);

    settle();
    component.rerender().unwrap();
    component.set_props(path("a")).unwrap();

    assert!(store.take_log().is_empty());
    assert_eq!(component.render_count(), 4);
}

#[test]
fn path_change_tears_down_before_binding_the_new_path() {
    let store = LoggingStore::default();
    let component = mount(&create_use(store.clone()), "a", Some(json!(1)), UseOptions::new());
    settle();
    store.take_log();

    component.set_props(path("b")).unwrap();

    assert_eq!(
        store.take_log(),
        ["unsubscribe a", "get b", "set b", "subscribe b"]
    );
    assert_eq!(store.inner.subscriber_count(), 1);
    assert_eq!(value(&component), Some(json!(1)));
    // Same effective value as before: no extra render.
    assert!(!Runtime::has_pending_work());

    component.unmount().unwrap();
    assert_eq!(store.take_log(), ["unsubscribe b"]);
    assert_eq!(store.inner.subscriber_count(), 0);
}

#[test]
fn path_change_picks_up_the_new_value() {
    let store = PathStore::new(json!({ "a": 1, "b": 2 }));
    let component = mount(&create_use(store.clone()), "a", None, UseOptions::new());
    assert_eq!(value(&component), Some(json!(1)));

    component.set_props(path("b")).unwrap();
    assert_eq!(value(&component), Some(json!(2)));
    settle();
    assert_eq!(value(&component), Some(json!(2)));

    // Writes to the old path no longer reach the component.
    let renders = component.render_count();
    store.set(&path("a"), Some(json!(10)), WriteMeta::default()).unwrap();
    assert!(!Runtime::has_pending_work());
    assert_eq!(component.render_count(), renders);
}

#[test]
fn default_is_seeded_into_an_undefined_path() {
    let store = PathStore::default();
    let component = mount(
        &create_use(store.clone()),
        "user.name",
        Some(json!("Anon")),
        UseOptions::new(),
    );

    assert_eq!(store.get(&path("user.name")), Some(json!("Anon")));
    assert_eq!(value(&component), Some(json!("Anon")));

    // One extra render to move the state cell onto the seeded value.
    assert!(Runtime::has_pending_work());
    settle();
    assert_eq!(component.render_count(), 2);
    assert_eq!(value(&component), Some(json!("Anon")));
}

#[test]
fn existing_value_wins_over_default() {
    let store = PathStore::new(json!({ "theme": "dark" }));
    let component = mount(
        &create_use(store.clone()),
        "theme",
        Some(json!("light")),
        UseOptions::new(),
    );

    assert_eq!(value(&component), Some(json!("dark")));
    assert_eq!(store.get(&path("theme")), Some(json!("dark")));
    assert!(store.last_write().is_none());
}

#[test]
fn override_replaces_existing_value() {
    let store = PathStore::new(json!({ "theme": "dark" }));
    let component = mount(
        &create_use(store.clone()),
        "theme",
        Some(json!("light")),
        UseOptions::new().override_existing(true).identifier("settings"),
    );

    assert_eq!(value(&component), Some(json!("light")));
    assert_eq!(store.get(&path("theme")), Some(json!("light")));
    let last = store.last_write().unwrap();
    assert_eq!(last.path, path("theme"));
    assert!(last.meta.is_from(&Identifier::from("settings")));
}

#[test]
fn undefined_without_default_writes_nothing() {
    let store = LoggingStore::default();
    let component = mount(&create_use(store.clone()), "missing", None, UseOptions::new());

    assert_eq!(value(&component), None);
    assert_eq!(store.take_log(), ["get missing", "subscribe missing"]);
    assert!(!Runtime::has_pending_work());
    assert_eq!(component.render_count(), 1);
}

#[test]
fn equal_notifications_do_not_rerender() {
    let store = PathStore::default();
    let component = mount(&create_use(store.clone()), "count", Some(json!(1)), UseOptions::new());
    settle();
    let renders = component.render_count();

    store.set(&path("count"), Some(json!(1)), WriteMeta::default()).unwrap();
    setter(&component).set_value(json!(1)).unwrap();
    assert!(!Runtime::has_pending_work());

    store.set(&path("count"), Some(json!(2)), WriteMeta::default()).unwrap();
    settle();
    assert_eq!(component.render_count(), renders + 1);
    assert_eq!(value(&component), Some(json!(2)));
}

#[test]
fn unmount_with_cleanup_clears_the_path() {
    let store = PathStore::default();
    let component = mount(
        &create_use(store.clone()),
        "draft",
        Some(json!("")),
        UseOptions::new().cleanup(true).identifier("editor"),
    );
    settle();
    assert_eq!(store.subscriber_count(), 1);

    component.unmount().unwrap();

    assert_eq!(store.get(&path("draft")), None);
    assert_eq!(store.subscriber_count(), 0);
    assert!(store.last_write().unwrap().meta.is_from(&Identifier::from("editor")));
    assert!(!Runtime::has_pending_work());
}

#[test]
fn unmount_without_cleanup_keeps_the_value() {
    let store = PathStore::default();
    let component = mount(&create_use(store.clone()), "draft", Some(json!("x")), UseOptions::new());
    settle();

    component.unmount().unwrap();
    component.unmount().unwrap();

    assert_eq!(store.get(&path("draft")), Some(json!("x")));
    assert_eq!(store.subscriber_count(), 0);

    // Torn down for good.
    store.set(&path("draft"), Some(json!("y")), WriteMeta::default()).unwrap();
    assert!(!Runtime::has_pending_work());
}

#[test]
fn cleanup_on_an_array_slot_leaves_it_undefined() {
    let store = PathStore::new(json!({ "todos": ["old"] }));
    let use_store = create_use(store.clone());
    let options = UseOptions::new().cleanup(true);

    let first = mount(&use_store, "todos.1", Some(json!("new")), options.clone());
    settle();
    assert_eq!(store.get(&path("todos.1")), Some(json!("new")));
    first.unmount().unwrap();
    assert_eq!(store.get(&path("todos.1")), None);

    // The next binding on the slot seeds its default again.
    let second = mount(&use_store, "todos.1", Some(json!("again")), options);
    assert_eq!(value(&second), Some(json!("again")));
    assert_eq!(store.get(&path("todos.1")), Some(json!("again")));
}

#[test]
fn failed_mount_releases_its_binding() {
    let store = PathStore::default();
    let use_store = create_use(store.clone());
    let result = Component::mount(path("a"), move |hooks, path: &Path| -> anyhow::Result<()> {
        use_store.use_path(hooks, path.clone(), Some(json!(1)), &UseOptions::new().cleanup(true))?;
        anyhow::bail!("render failed")
    });

    assert_eq!(result.unwrap_err().to_string(), "render failed");
    assert_eq!(store.subscriber_count(), 0);
    assert_eq!(store.get(&path("a")), None);
    settle();
}

#[test]
fn rebind_with_cleanup_queues_no_stale_render() {
    let store = PathStore::default();
    let component = mount(
        &create_use(store.clone()),
        "a",
        Some(json!(1)),
        UseOptions::new().cleanup(true),
    );
    settle();

    component.set_props(path("b")).unwrap();

    assert_eq!(store.get(&path("a")), None);
    assert_eq!(value(&component), Some(json!(1)));
    assert!(!Runtime::has_pending_work());
}

#[test]
fn user_name_walkthrough() {
    let store = PathStore::default();
    let use_store = create_use(store.clone());
    let component = mount(
        &use_store,
        "user.name",
        Some(json!("Anon")),
        UseOptions::new().identifier("profile"),
    );
    assert_eq!(store.snapshot(), json!({ "user": { "name": "Anon" } }));
    assert_eq!(value(&component), Some(json!("Anon")));
    settle();

    setter(&component).set_value(json!("Alice")).unwrap();
    let last = store.last_write().unwrap();
    assert_eq!(last.path, Path::from(["user", "name"]));
    assert!(last.meta.is_from(&Identifier::from("profile")));
    // The setter only writes; the new value arrives through the store.
    assert_eq!(value(&component), Some(json!("Anon")));
    settle();
    assert_eq!(value(&component), Some(json!("Alice")));
    assert_eq!(component.render_count(), 3);

    store
        .set(
            &path("user.name"),
            Some(json!("Alice")),
            WriteMeta::default().with_identifier("sync"),
        )
        .unwrap();
    assert!(!Runtime::has_pending_work());
    assert_eq!(component.render_count(), 3);
}

#[test]
fn per_call_identifier_overrides_hook_identifier() {
    let store = PathStore::default();
    let component = mount(
        &create_use(store.clone()),
        "n",
        None,
        UseOptions::new().identifier("hook"),
    );

    setter(&component)
        .set(Some(json!(1)), SetOptions::new().identifier("call"))
        .unwrap();
    assert!(store.last_write().unwrap().meta.is_from(&Identifier::from("call")));

    setter(&component).set_value(json!(2)).unwrap();
    assert!(store.last_write().unwrap().meta.is_from(&Identifier::from("hook")));
}

#[test]
fn no_publish_writes_do_not_rerender() {
    let store = PathStore::default();
    let component = mount(
        &create_use(store.clone()),
        "n",
        Some(json!(0)),
        UseOptions::new().no_publish(true),
    );
    settle();

    setter(&component).set_value(json!(5)).unwrap();
    assert_eq!(store.get(&path("n")), Some(json!(5)));
    assert!(!Runtime::has_pending_work());
    assert_eq!(value(&component), Some(json!(0)));

    setter(&component)
        .set(Some(json!(6)), SetOptions::new().no_publish(false))
        .unwrap();
    settle();
    assert_eq!(value(&component), Some(json!(6)));
}

#[test]
fn writes_above_and_below_the_path_propagate() {
    let store = PathStore::default();
    let use_store = create_use(store.clone());
    let name = mount(&use_store, "user.name", Some(json!("Anon")), UseOptions::new());
    let user = mount(&use_store, "user", None, UseOptions::new());
    settle();
    assert_eq!(value(&user), Some(json!({ "name": "Anon" })));

    store
        .set(&path("user"), Some(json!({ "name": "Bob" })), WriteMeta::default())
        .unwrap();
    settle();
    assert_eq!(value(&name), Some(json!("Bob")));

    setter(&name).set_value(json!("Carol")).unwrap();
    settle();
    assert_eq!(value(&user), Some(json!({ "name": "Carol" })));
}

#[test]
fn components_bound_to_one_path_share_writes() {
    let store = PathStore::default();
    let use_store = create_use(store.clone());
    let left = mount(&use_store, "shared", Some(json!(0)), UseOptions::new().identifier("left"));
    let right = mount(&use_store, "shared", Some(json!(99)), UseOptions::new().identifier("right"));
    settle();
    // The first binding seeded; the second found a value.
    assert_eq!(value(&right), Some(json!(0)));

    setter(&left).set_value(json!(1)).unwrap();
    assert!(store.last_write().unwrap().meta.is_from(&Identifier::from("left")));
    settle();
    assert_eq!(value(&left), Some(json!(1)));
    assert_eq!(value(&right), Some(json!(1)));
}

#[test]
fn custom_equality_controls_echo_suppression() {
    fn same_ignoring_case(a: &Value, b: &Value) -> bool {
        match (a.as_str(), b.as_str()) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => a == b,
        }
    }

    let store = PathStore::default();
    let use_store = UseStore::with_equality(store.clone(), same_ignoring_case);
    let component = mount(&use_store, "name", Some(json!("alice")), UseOptions::new());
    settle();
    let renders = component.render_count();

    store.set(&path("name"), Some(json!("ALICE")), WriteMeta::default()).unwrap();
    assert!(!Runtime::has_pending_work());
    assert_eq!(component.render_count(), renders);
    assert_eq!(value(&component), Some(json!("alice")));
}

#[test]
fn store_errors_propagate_out_of_the_render() {
    let store = PathStore::new(json!({ "flag": true }));
    let use_store = create_use(store.clone());
    let result = Component::mount(path("flag.inner"), move |hooks, path: &Path| {
        let bound = use_store.use_path(hooks, path.clone(), Some(json!(1)), &UseOptions::new())?;
        Ok(bound)
    });

    let err = result.unwrap_err();
    assert_eq!(
        err.downcast_ref::<StoreError>(),
        Some(&StoreError::NotAContainer { path: path("flag") })
    );
    assert_eq!(store.subscriber_count(), 0);
}

#[test]
fn run_once_on_change_follows_its_deps() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let component = Component::mount("a", {
        let log = log.clone();
        move |hooks, deps: &&str| {
            let deps = *deps;
            let log = log.clone();
            let ran = use_run_once_on_change(hooks, deps, move || {
                log.borrow_mut().push(format!("run {deps}"));
                let teardown: Teardown<StoreError> = Box::new(move || {
                    log.borrow_mut().push(format!("teardown {deps}"));
                    Ok(())
                });
                Ok(Some(teardown))
            })?;
            Ok(ran)
        }
    })
    .unwrap();
    assert_eq!(component.output(), Some(true));

    component.set_props("a").unwrap();
    assert_eq!(component.output(), Some(false));
    component.set_props("b").unwrap();
    component.unmount().unwrap();

    assert_eq!(
        *log.borrow(),
        ["run a", "teardown a", "run b", "teardown b"]
    );
}
