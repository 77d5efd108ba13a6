use super::*;

#[test]
fn test_define_and_lookup() {
    let mut env: Environment<&str> = Environment::new();
    assert_eq!(env.define("x", "%x", Type::Int), "%x");
    assert_eq!(env.lookup("x"), Some(("%x", Type::Int)));
    assert_eq!(env.lookup("y"), None);
}

#[test]
fn test_redefinition_in_same_frame_overwrites() {
    let mut env: Environment<&str> = Environment::new();
    env.define("x", "%a", Type::Int);
    env.define("x", "%b", Type::Float);
    assert_eq!(env.lookup("x"), Some(("%b", Type::Float)));
}

#[test]
fn test_lookup_walks_outward() {
    let mut env: Environment<&str> = Environment::new();
    env.define("outer", "@outer", Type::Bool);
    let root = env.current();
    env.enter(root);
    let middle = env.current();
    env.enter(middle);

    assert_eq!(env.lookup("outer"), Some(("@outer", Type::Bool)));
    assert_eq!(env.lookup_local("outer"), None);
}

#[test]
fn test_shadowing_is_undone_on_exit() {
    let mut env: Environment<&str> = Environment::new();
    env.define("x", "@x", Type::Int);
    env.enter(env.current());
    env.define("x", "%x.inner", Type::Float);
    assert_eq!(env.lookup("x"), Some(("%x.inner", Type::Float)));
    env.exit();
    assert_eq!(env.lookup("x"), Some(("@x", Type::Int)));
}

#[test]
fn test_inner_bindings_vanish_on_exit() {
    let mut env: Environment<&str> = Environment::new();
    env.enter(env.root());
    env.define("local", "%local", Type::Int);
    assert_eq!(env.depth(), 2);
    env.exit();
    assert_eq!(env.depth(), 1);
    assert!(env.is_root());
    assert_eq!(env.lookup("local"), None);
}

#[test]
fn test_parent_is_chosen_by_caller() {
    let mut env: Environment<&str> = Environment::new();
    env.define("global", "@g", Type::Int);
    let root = env.root();

    // a block introduces `hidden`
    env.enter(root);
    env.define("hidden", "%h", Type::Int);

    // a frame parented on the root cannot see the block's names
    env.enter(root);
    assert_eq!(env.lookup("hidden"), None);
    assert_eq!(env.lookup("global"), Some(("@g", Type::Int)));
    env.exit();

    assert_eq!(env.lookup("hidden"), Some(("%h", Type::Int)));
}

#[test]
fn test_exit_at_root_is_noop() {
    let mut env: Environment<&str> = Environment::new();
    env.define("x", "@x", Type::Int);
    env.exit();
    assert_eq!(env.lookup("x"), Some(("@x", Type::Int)));
}
