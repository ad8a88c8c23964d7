use std::{
    env, fs,
    io::Write,
    path::{Path, PathBuf},
};

#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy)]
enum IRSensor {
    Primary,
    Secondary,
}
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy)]
enum IRMotor {
    Left,
    Right,
    Arm,
}
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone, Copy)]
enum IRStop {
    Coast,
    Brake,
    Hold,
}
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
enum IRAction {
    Straight(f64),
    Turn(f64),
    Stop,
    Settings(f64, f64, f64, f64),
    LineFollow {
        sensor: IRSensor,
        rotations: f64,
        speed: f64,
        kp: f64,
        kd: f64,
    },
    RunTarget {
        motor: IRMotor,
        speed: f64,
        target: f64,
        then: IRStop,
        wait: bool,
    },
    RunUntilStalled {
        motor: IRMotor,
        speed: f64,
        then: IRStop,
        duty_limit: f64,
    },
    StopMotor(IRMotor),
    Wait(u64),
}
#[derive(serde::Serialize, serde::Deserialize, Debug, Clone)]
struct IRRoutine {
    name: String,
    actions: Vec<IRAction>,
}

fn parse_number(s: &str) -> f64 {
    s.trim().parse::<f64>().expect("invalid number")
}
fn parse_bool(s: &str) -> bool {
    match s.trim() {
        "true" => true,
        "false" => false,
        _ => panic!("invalid bool"),
    }
}
fn parse_motor(s: &str) -> IRMotor {
    match s.trim() {
        "left" => IRMotor::Left,
        "right" => IRMotor::Right,
        "arm" => IRMotor::Arm,
        other => panic!("unknown motor {other:?}"),
    }
}
fn parse_stop(s: &str) -> IRStop {
    match s.trim() {
        "coast" => IRStop::Coast,
        "brake" => IRStop::Brake,
        "hold" => IRStop::Hold,
        other => panic!("unknown stop behavior {other:?}"),
    }
}
fn parse_sensor(s: &str) -> IRSensor {
    match s.trim() {
        "primary" => IRSensor::Primary,
        "secondary" => IRSensor::Secondary,
        other => panic!("unknown sensor {other:?}"),
    }
}

#[derive(Default)]
struct Attrs {
    speed: Option<f64>,
    kp: Option<f64>,
    kd: Option<f64>,
    target: Option<f64>,
    duty_limit: Option<f64>,
    then: Option<IRStop>,
    wait: Option<bool>,
    sensor: Option<IRSensor>,
}

fn parse_attrs(rest: &str) -> Attrs {
    let mut attrs = Attrs::default();
    for pair in rest.split_whitespace() {
        let (key, value) = pair.split_once('=').expect("attribute key=value");
        match key {
            "speed" => attrs.speed = Some(parse_number(value)),
            "kp" => attrs.kp = Some(parse_number(value)),
            "kd" => attrs.kd = Some(parse_number(value)),
            "target" => attrs.target = Some(parse_number(value)),
            "duty_limit" => attrs.duty_limit = Some(parse_number(value)),
            "then" => attrs.then = Some(parse_stop(value)),
            "wait" => attrs.wait = Some(parse_bool(value)),
            "sensor" => attrs.sensor = Some(parse_sensor(value)),
            other => panic!("unknown attribute {other:?}"),
        }
    }
    attrs
}

fn parse_line(line: &str) -> IRAction {
    let (command, args) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
    let args = args.trim();
    match command {
        // straight distance_mm
        "straight" => IRAction::Straight(parse_number(args)),
        // turn angle_deg
        "turn" => IRAction::Turn(parse_number(args)),
        "stop" => IRAction::Stop,
        // settings straight_speed straight_accel turn_rate turn_accel
        "settings" => {
            let v: Vec<f64> = args.split_whitespace().map(parse_number).collect();
            assert_eq!(v.len(), 4, "settings takes four numbers");
            IRAction::Settings(v[0], v[1], v[2], v[3])
        }
        // line_follow rotations speed= kp= kd= [sensor=]
        "line_follow" => {
            let (rotations, rest) = args.split_once(' ').expect("line_follow rotations attrs");
            let a = parse_attrs(rest);
            IRAction::LineFollow {
                sensor: a.sensor.unwrap_or(IRSensor::Primary),
                rotations: parse_number(rotations),
                speed: a.speed.expect("line_follow speed="),
                kp: a.kp.expect("line_follow kp="),
                kd: a.kd.expect("line_follow kd="),
            }
        }
        // run_target motor speed= target= [then=] [wait=]
        "run_target" => {
            let (motor, rest) = args.split_once(' ').expect("run_target motor attrs");
            let a = parse_attrs(rest);
            IRAction::RunTarget {
                motor: parse_motor(motor),
                speed: a.speed.expect("run_target speed="),
                target: a.target.expect("run_target target="),
                then: a.then.unwrap_or(IRStop::Brake),
                wait: a.wait.unwrap_or(true),
            }
        }
        // run_until_stalled motor speed= duty_limit= [then=]
        "run_until_stalled" => {
            let (motor, rest) = args.split_once(' ').expect("run_until_stalled motor attrs");
            let a = parse_attrs(rest);
            IRAction::RunUntilStalled {
                motor: parse_motor(motor),
                speed: a.speed.expect("run_until_stalled speed="),
                then: a.then.unwrap_or(IRStop::Brake),
                duty_limit: a.duty_limit.unwrap_or(100.0),
            }
        }
        // stop_motor motor
        "stop_motor" => IRAction::StopMotor(parse_motor(args)),
        // wait milliseconds
        "wait" => IRAction::Wait(args.parse().expect("milliseconds")),
        other => panic!("unknown routine command {other:?}"),
    }
}

fn parse_routine(name: &str, content: &str) -> IRRoutine {
    let actions = content
        .lines()
        .map(|l| l.split('#').next().unwrap_or("").trim())
        .filter(|l| !l.is_empty())
        .map(parse_line)
        .collect();

    IRRoutine {
        name: name.to_string(),
        actions,
    }
}

fn find_routine_files(dir: &Path) -> Vec<PathBuf> {
    let mut res = Vec::new();
    if let Ok(read) = fs::read_dir(dir) {
        for e in read.flatten() {
            let p = e.path();
            if p.extension().and_then(|s| s.to_str()) == Some("routine") {
                if let Some(name) = p.file_name().and_then(|s| s.to_str())
                    && (name.starts_with('.') || name.starts_with("._"))
                {
                    continue;
                }
                res.push(p);
            }
        }
    }
    res.sort();
    res
}

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let routines_dir = Path::new("src/routines");
    println!("cargo:rerun-if-changed=src/routines");

    let files = find_routine_files(routines_dir);
    let mut index_src = String::from("pub static ROUTINE_BLOBS: &[(&str, &[u8])] = &[\n");
    for file in files {
        let name = file.file_stem().unwrap().to_string_lossy().to_string();
        println!("cargo:rerun-if-changed={}", file.display());
        let content = fs::read_to_string(&file).expect("read .routine");
        let routine = parse_routine(&name, &content);
        let bytes = postcard::to_allocvec(&routine).expect("serialize routine");
        let out_file = out_dir.join(format!("routine_{name}.bin"));
        fs::write(&out_file, &bytes).expect("write bin");
        index_src.push_str(&format!(
            "    (\"{}\", include_bytes!(concat!(env!(\"OUT_DIR\"), \"/{}\")) as &[u8]),\n",
            name,
            out_file.file_name().unwrap().to_string_lossy()
        ));
    }
    index_src.push_str("];");
    let mut f = fs::File::create(out_dir.join("routines_index.rs")).expect("create index");
    f.write_all(index_src.as_bytes()).unwrap();
}
