fn main() -> anyhow::Result<()> {
    pagenotes::app::run()
}
