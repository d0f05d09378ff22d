fn main() -> anyhow::Result<()> {
    evseg_lib::run()
}
