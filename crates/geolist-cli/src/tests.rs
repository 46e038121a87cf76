use super::*;

#[test]
fn parses_views_command() {
    let cli = Cli::try_parse_from(["geolist", "views"]).expect("expected valid cli args");
    assert!(matches!(cli.command, Some(Commands::Views)));
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["geolist"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn load_defaults_to_first_page_with_cache() {
    let cli = Cli::try_parse_from(["geolist", "load", "cities"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Load {
            view: Some(ref v),
            page: 1,
            refresh: false,
            no_cache: false,
            summarize: false,
            ..
        }) if v == "cities"
    ));
}

#[test]
fn load_accepts_descriptor_overrides() {
    let cli = Cli::try_parse_from([
        "geolist",
        "load",
        "--fragment",
        "map=visits&id=3",
        "--search",
        "athens",
        "--summarize",
        "--page",
        "2",
    ])
    .unwrap();
    let Some(Commands::Load {
        view,
        fragment,
        search,
        summarize,
        page,
        ..
    }) = cli.command
    else {
        panic!("expected load command");
    };
    assert!(view.is_none());
    assert_eq!(fragment.as_deref(), Some("map=visits&id=3"));
    assert_eq!(search.as_deref(), Some("athens"));
    assert!(summarize);
    assert_eq!(page, 2);
}

#[test]
fn refresh_local_requires_a_view() {
    assert!(Cli::try_parse_from(["geolist", "refresh-local"]).is_err());
    let cli = Cli::try_parse_from(["geolist", "refresh-local", "visits"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::RefreshLocal { ref view }) if view == "visits"));
}

#[test]
fn flags_override_the_fragment() {
    let request = commands::LoadRequest {
        view: Some("parks".to_owned()),
        fragment: "map=cities&search=old&details=map".to_owned(),
        search: Some("stone".to_owned()),
        summarize: true,
        page: 1,
        id: None,
        refresh: false,
        use_cache: true,
        json: false,
    };
    assert_eq!(
        request.descriptor().to_fragment(),
        "map=parks&search=stone&details=map&summarize=true"
    );
}

#[test]
fn parses_fragment_with_prior() {
    let cli =
        Cli::try_parse_from(["geolist", "fragment", "map=a&id=2", "--prior", "map=a"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Fragment { ref fragment, prior: Some(ref p) }) if fragment == "map=a&id=2" && p == "map=a"
    ));
}
