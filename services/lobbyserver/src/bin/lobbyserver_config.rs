use lobbycore::LobbyConfig;
use serdeconv;

fn main() {
    let config = serdeconv::to_toml_string(&LobbyConfig::default()).expect("Failed to generate config file");

    println!("{}", config);
}
