use clap::Parser;
use pmail::cli::{AuthCommand, Cli, Command, ConfigCommand, DraftCommand, LabelCommand};

#[test]
fn parses_auth_login() {
    let cli = Cli::try_parse_from(["pmail", "auth", "login", "--password-stdin"])
        .expect("cli parse should work");
    match cli.command {
        Command::Auth(auth) => match auth.command {
            AuthCommand::Login(login) => {
                assert!(login.password_stdin);
                assert!(login.username.is_none());
            }
            _ => panic!("expected login"),
        },
        _ => panic!("expected auth command"),
    }
}

#[test]
fn parses_read() {
    let cli = Cli::try_parse_from(["pmail", "read", "42", "--attachments", "-m", "Archive"])
        .expect("cli parse should work");
    match cli.command {
        Command::Read(read) => {
            assert_eq!(read.id, "42");
            assert!(read.attachments);
            assert_eq!(read.mailbox.as_deref(), Some("Archive"));
        }
        _ => panic!("expected read command"),
    }
}

#[test]
fn parses_send() {
    let cli = Cli::try_parse_from([
        "pmail",
        "send",
        "--to",
        "dev@example.com,ops@example.com",
        "--subject",
        "hi",
        "--body",
        "hello",
        "--attach",
        "a.txt",
        "--attach",
        "b.txt",
        "--idempotency-key",
        "job-17",
    ])
    .expect("cli parse should work");
    match cli.command {
        Command::Send(send) => {
            assert_eq!(send.to, ["dev@example.com", "ops@example.com"]);
            assert_eq!(send.subject.as_deref(), Some("hi"));
            assert_eq!(send.body.body.as_deref(), Some("hello"));
            assert_eq!(send.attach.len(), 2);
            assert_eq!(send.idempotency_key.as_deref(), Some("job-17"));
        }
        _ => panic!("expected send command"),
    }
}

#[test]
fn parses_list() {
    let cli = Cli::try_parse_from(["pmail", "list", "--limit", "3", "--page", "2", "--unread"])
        .expect("cli parse should work");
    match cli.command {
        Command::List(list) => {
            assert_eq!(list.limit, Some(3));
            assert_eq!(list.page, Some(2));
            assert_eq!(list.offset, 0);
            assert!(list.unread);
            assert!(list.mailbox.is_none());
        }
        _ => panic!("expected list command"),
    }
}

#[test]
fn parses_batch_delete_with_query() {
    let cli = Cli::try_parse_from([
        "pmail",
        "delete",
        "--query",
        "from:spam@example.com",
        "--permanent",
    ])
    .expect("cli parse should work");
    match cli.command {
        Command::Delete(delete) => {
            assert!(delete.target.ids.is_empty());
            assert_eq!(delete.target.query.as_deref(), Some("from:spam@example.com"));
            assert!(delete.permanent);
        }
        _ => panic!("expected delete command"),
    }
}

#[test]
fn parses_move_ids() {
    let cli = Cli::try_parse_from(["pmail", "move", "1", "3", "7", "-d", "Archive"])
        .expect("cli parse should work");
    match cli.command {
        Command::Move(args) => {
            assert_eq!(args.target.ids, ["1", "3", "7"]);
            assert_eq!(args.destination, "Archive");
        }
        _ => panic!("expected move command"),
    }
}

#[test]
fn rejects_conflicting_flags() {
    assert!(Cli::try_parse_from(["pmail", "flag", "1", "--read", "--unread"]).is_err());
}

#[test]
fn parses_search_filters() {
    let cli = Cli::try_parse_from([
        "pmail",
        "search",
        "invoice",
        "--from",
        "billing@example.com",
        "--larger-than",
        "1M",
        "--or",
        "--not",
    ])
    .expect("cli parse should work");
    match cli.command {
        Command::Search(search) => {
            assert_eq!(search.query.as_deref(), Some("invoice"));
            assert_eq!(search.from.as_deref(), Some("billing@example.com"));
            assert_eq!(search.larger_than.as_deref(), Some("1M"));
            assert!(search.or);
            assert!(search.not);
        }
        _ => panic!("expected search command"),
    }
}

#[test]
fn parses_download() {
    let cli = Cli::try_parse_from(["pmail", "download", "12", "1", "-o", "/tmp/report.pdf"])
        .expect("cli parse should work");
    match cli.command {
        Command::Download(download) => {
            assert_eq!(download.id, "12");
            assert_eq!(download.index, 1);
            assert!(download.out.is_some());
        }
        _ => panic!("expected download command"),
    }
}

#[test]
fn parses_label_and_draft_subcommands() {
    let cli = Cli::try_parse_from(["pmail", "label", "rm", "2", "--label", "Work"])
        .expect("cli parse should work");
    match cli.command {
        Command::Label(label) => match label.command {
            LabelCommand::Remove(remove) => {
                assert_eq!(remove.label, "Work");
                assert_eq!(remove.target.ids, ["2"]);
            }
            _ => panic!("expected label remove"),
        },
        _ => panic!("expected label command"),
    }

    let cli = Cli::try_parse_from(["pmail", "draft", "delete", "4", "5"])
        .expect("cli parse should work");
    match cli.command {
        Command::Draft(draft) => match draft.command {
            DraftCommand::Delete(delete) => assert_eq!(delete.ids, ["4", "5"]),
            _ => panic!("expected draft delete"),
        },
        _ => panic!("expected draft command"),
    }
}

#[test]
fn parses_watch_defaults() {
    let cli = Cli::try_parse_from(["pmail", "watch", "--exec", "notify-send {}", "--once"])
        .expect("cli parse should work");
    match cli.command {
        Command::Watch(watch) => {
            assert_eq!(watch.interval, 30);
            assert_eq!(watch.exec.as_deref(), Some("notify-send {}"));
            assert!(watch.once);
            assert!(!watch.unread);
        }
        _ => panic!("expected watch command"),
    }
}

#[test]
fn global_flags_work_after_subcommand() {
    let cli = Cli::try_parse_from(["pmail", "list", "--json", "-vv", "--profile", "work"])
        .expect("cli parse should work");
    assert!(cli.json);
    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.profile, "work");
}

#[test]
fn parses_config_validate_and_doctor() {
    let cli = Cli::try_parse_from(["pmail", "--profile", "work", "config", "validate"])
        .expect("cli parse should work");
    assert_eq!(cli.profile, "work");
    match cli.command {
        Command::Config(config) => assert!(matches!(config.command, ConfigCommand::Validate)),
        _ => panic!("expected config command"),
    }

    let cli = Cli::try_parse_from(["pmail", "--json", "config", "doctor"])
        .expect("cli parse should work");
    assert!(cli.json);
    match cli.command {
        Command::Config(config) => assert!(matches!(config.command, ConfigCommand::Doctor)),
        _ => panic!("expected config command"),
    }
}
