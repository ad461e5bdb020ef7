use std::{fs, sync::Arc};
use teloxide::{dptree::deps, prelude::*, types::BotCommand};

use crate::{
    config::BotConfig, database::Database, enforcement::enforcement_spinloop, handlers,
    state::BotState, status::status_spinloop, COMMAND_NAME, CONFIG_PATH,
};

/// # Panics
///
/// Panics if there's no key file, the config is broken or the database can't be opened.
pub async fn entry() {
    log::info!("Starting up...");
    let key = fs::read_to_string(match cfg!(debug_assertions) {
        true => "key_debug",
        false => "key",
    })
    .expect("Could not load bot key file!");

    let bot = Bot::new(key.trim());

    let config = BotConfig::load(CONFIG_PATH).expect("Could not load the config!");

    let database = Arc::new(
        Database::new(&config.database)
            .await
            .expect("Could not init the database!"),
    );
    database
        .ensure_lists(config.lists.names())
        .await
        .expect("Could not create the lists!");
    database.idle_cleanup().await;

    bot.set_my_commands(vec![BotCommand::new(
        COMMAND_NAME,
        "Show sign-up lists. Send /list help for everything else.",
    )])
    .await
    .expect("Failed to set bot commands!");

    tokio::spawn(enforcement_spinloop(
        Arc::downgrade(&database),
        config.enforcement_interval,
    ));

    let state = Arc::new(BotState::new(database, config));

    tokio::spawn(status_spinloop(bot.clone(), Arc::downgrade(&state)));

    log::info!("Creating the handler...");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handlers::handle_message));

    log::info!("Dispatching the dispatcher!");

    Dispatcher::builder(bot, handler)
        .default_handler(|_| async {})
        .dependencies(deps![state])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("it appears we have been bonked.");
}
