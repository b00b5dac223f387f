fn main() -> anyhow::Result<()> {
    forest_guide_lib::run()
}
