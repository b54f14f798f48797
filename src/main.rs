use swarmer::error::AppResult;

fn main() -> AppResult<()> {
    swarmer::run()
}
