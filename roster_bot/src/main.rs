fn main() {
    bot_commons::start_everything("WARN,roster_bot=debug", roster_bot::entry());
}
