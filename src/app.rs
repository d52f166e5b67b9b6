use crate::cli::{Cli, Command};
use crate::commands;
use crate::context::AppContext;
use crate::error::AppResult;

pub async fn run(cli: Cli) -> AppResult<()> {
    let Cli {
        profile,
        json,
        verbose,
        config,
        command,
    } = cli;

    let ctx = AppContext::bootstrap(profile, json, verbose, config)?;

    match command {
        Command::Auth(args) => commands::auth::run(&ctx, args.command).await,
        Command::Config(args) => commands::config::run(&ctx, args.command).await,
        Command::List(args) => commands::list::run(&ctx, args).await,
        Command::Read(args) => commands::read::run(&ctx, args).await,
        Command::Send(args) => commands::send::run(&ctx, args).await,
        Command::Reply(args) => commands::send::reply(&ctx, args).await,
        Command::Forward(args) => commands::send::forward(&ctx, args).await,
        Command::Search(args) => commands::search::run(&ctx, args).await,
        Command::Delete(args) => commands::batch::delete(&ctx, args).await,
        Command::Move(args) => commands::batch::move_messages(&ctx, args).await,
        Command::Flag(args) => commands::batch::flag(&ctx, args).await,
        Command::Download(args) => commands::download::run(&ctx, args).await,
        Command::Draft(args) => commands::draft::run(&ctx, args.command).await,
        Command::Label(args) => commands::label::run(&ctx, args.command).await,
        Command::Mailbox(args) => commands::mailbox::run(&ctx, args.command).await,
        Command::Watch(args) => commands::watch::run(&ctx, args).await,
        Command::Schema => commands::schema::run(&ctx).await,
    }
}
